//! Bootstrap dataset written on first run.

use serde::Deserialize;

use super::ClinicState;
use crate::models::{DirectoryEntry, Incident, Patient, Principal};

/// Demo clinic: one admin, two patient logins, three patients, four incidents.
const BOOTSTRAP_JSON: &str = r#"{
  "principals": [
    { "id": "1", "role": "Admin", "email": "admin@entnt.in", "secret": "admin123", "name": "Dr. Smith" },
    { "id": "2", "role": "Patient", "email": "john@entnt.in", "secret": "patient123", "patientId": "p1", "name": "John Doe" },
    { "id": "3", "role": "Patient", "email": "jane@entnt.in", "secret": "patient123", "patientId": "p2", "name": "Jane Smith" }
  ],
  "patients": [
    {
      "id": "p1",
      "name": "John Doe",
      "dateOfBirth": "1990-05-10",
      "contact": "1234567890",
      "email": "john@entnt.in",
      "address": "123 Main St, City",
      "healthInfo": "No known allergies. Previous dental work includes fillings."
    },
    {
      "id": "p2",
      "name": "Jane Smith",
      "dateOfBirth": "1985-03-15",
      "contact": "0987654321",
      "email": "jane@entnt.in",
      "address": "456 Oak Ave, City",
      "healthInfo": "Allergic to latex. History of gum disease."
    },
    {
      "id": "p3",
      "name": "Mike Johnson",
      "dateOfBirth": "1995-08-22",
      "contact": "5551234567",
      "email": "mike@entnt.in",
      "address": "789 Pine St, City",
      "healthInfo": "No allergies. Regular cleanings."
    }
  ],
  "incidents": [
    {
      "id": "i1",
      "patientId": "p1",
      "title": "Toothache Treatment",
      "description": "Upper molar pain requiring root canal",
      "comments": "Patient reports sensitivity to cold and hot liquids",
      "appointmentDate": "2025-07-01T10:00:00Z",
      "cost": 450,
      "treatment": "Root canal therapy on tooth #14",
      "status": "Completed",
      "nextDate": "2025-08-01T10:00:00Z",
      "files": [
        { "id": "f1", "name": "invoice.pdf", "url": "data:application/pdf;base64,sample", "mimeType": "application/pdf" },
        { "id": "f2", "name": "xray.png", "url": "data:image/png;base64,sample", "mimeType": "image/png" }
      ]
    },
    {
      "id": "i2",
      "patientId": "p1",
      "title": "Regular Cleaning",
      "description": "6-month routine cleaning and checkup",
      "comments": "Good oral hygiene maintained",
      "appointmentDate": "2025-07-15T14:00:00Z",
      "cost": 120,
      "treatment": "Professional cleaning and fluoride treatment",
      "status": "Scheduled",
      "nextDate": "2026-01-15T14:00:00Z",
      "files": []
    },
    {
      "id": "i3",
      "patientId": "p2",
      "title": "Crown Replacement",
      "description": "Replace old crown on molar",
      "comments": "Crown showing signs of wear",
      "appointmentDate": "2025-07-08T09:00:00Z",
      "cost": 800,
      "treatment": "Ceramic crown replacement",
      "status": "In Progress",
      "nextDate": "2025-07-22T09:00:00Z",
      "files": []
    },
    {
      "id": "i4",
      "patientId": "p3",
      "title": "Wisdom Tooth Extraction",
      "description": "Remove impacted wisdom tooth",
      "comments": "Local anesthesia required",
      "appointmentDate": "2025-07-12T11:00:00Z",
      "cost": 300,
      "treatment": "Surgical extraction",
      "status": "Scheduled",
      "nextDate": null,
      "files": []
    }
  ]
}"#;

#[derive(Deserialize)]
struct SeedPrincipal {
    #[serde(flatten)]
    principal: Principal,
    secret: String,
}

#[derive(Deserialize)]
struct SeedDocument {
    principals: Vec<SeedPrincipal>,
    patients: Vec<Patient>,
    incidents: Vec<Incident>,
}

/// Parsed bootstrap dataset.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub directory: Vec<DirectoryEntry>,
    pub state: ClinicState,
}

/// Parse the bootstrap dataset, hashing seeded secrets.
pub fn bootstrap() -> serde_json::Result<Bootstrap> {
    let doc: SeedDocument = serde_json::from_str(BOOTSTRAP_JSON)?;
    let directory = doc
        .principals
        .into_iter()
        .map(|seed| DirectoryEntry::new(seed.principal, &seed.secret))
        .collect();

    Ok(Bootstrap {
        directory,
        state: ClinicState {
            patients: doc.patients,
            incidents: doc.incidents,
        },
    })
}
