//! Incident (appointment / treatment) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::timestamp;

/// Incident status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IncidentStatus {
    /// Booked, not started
    #[default]
    Scheduled,
    /// Treatment under way
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    /// Treatment done; the only status that counts toward revenue
    Completed,
    /// Called off
    Cancelled,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Scheduled => "Scheduled",
            IncidentStatus::InProgress => "In Progress",
            IncidentStatus::Completed => "Completed",
            IncidentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(IncidentStatus::Scheduled),
            "in progress" | "inprogress" | "in_progress" => Ok(IncidentStatus::InProgress),
            "completed" => Ok(IncidentStatus::Completed),
            "cancelled" | "canceled" => Ok(IncidentStatus::Cancelled),
            other => Err(format!("unknown incident status: {other}")),
        }
    }
}

/// File attached to an incident (invoice, x-ray, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    /// Usually a data URL
    pub url: String,
    #[serde(alias = "type")]
    pub mime_type: String,
}

/// An appointment or treatment event for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Store-assigned identifier
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub treatment: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub appointment_date: DateTime<Utc>,
    /// Advisory follow-up date; not ordered against `appointment_date`
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub next_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default)]
    pub files: Vec<Attachment>,
}

/// Caller-supplied fields for a new incident.
///
/// `files` is accepted for symmetry with [`Incident`] but a created incident
/// always starts without attachments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFields {
    pub patient_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub treatment: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub appointment_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub next_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default)]
    pub files: Vec<Attachment>,
}

impl IncidentFields {
    /// Minimal scheduled incident at zero cost.
    pub fn new(
        patient_id: impl Into<String>,
        title: impl Into<String>,
        appointment_date: DateTime<Utc>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            title: title.into(),
            description: String::new(),
            comments: String::new(),
            treatment: String::new(),
            appointment_date,
            next_date: None,
            cost: 0.0,
            status: IncidentStatus::Scheduled,
            files: Vec::new(),
        }
    }
}

impl Incident {
    /// Build an incident from fields and a store-assigned id. Attachments are dropped.
    pub fn from_fields(id: String, fields: IncidentFields) -> Self {
        Self {
            id,
            patient_id: fields.patient_id,
            title: fields.title,
            description: fields.description,
            comments: fields.comments,
            treatment: fields.treatment,
            appointment_date: fields.appointment_date,
            next_date: fields.next_date,
            cost: fields.cost,
            status: fields.status,
            files: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == IncidentStatus::Completed
    }

    /// Cost as counted by aggregates: malformed or negative amounts count as zero.
    pub fn billable_cost(&self) -> f64 {
        if self.cost.is_finite() && self.cost > 0.0 {
            self.cost
        } else {
            0.0
        }
    }
}

/// Check that a cost is a finite, non-negative amount.
pub fn is_valid_cost(cost: f64) -> bool {
    cost.is_finite() && cost >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, day, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_from_fields_drops_files() {
        let mut fields = IncidentFields::new("p1", "Cleaning", at(1));
        fields.files.push(Attachment {
            id: "f1".into(),
            name: "xray.png".into(),
            url: "data:image/png;base64,sample".into(),
            mime_type: "image/png".into(),
        });

        let incident = Incident::from_fields("i1".into(), fields);
        assert!(incident.files.is_empty());
        assert_eq!(incident.status, IncidentStatus::Scheduled);
        assert_eq!(incident.cost, 0.0);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&IncidentStatus::InProgress).unwrap(),
            r#""In Progress""#
        );
        let parsed: IncidentStatus = serde_json::from_str(r#""InProgress""#).unwrap();
        assert_eq!(parsed, IncidentStatus::InProgress);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("completed".parse::<IncidentStatus>(), Ok(IncidentStatus::Completed));
        assert_eq!("In Progress".parse::<IncidentStatus>(), Ok(IncidentStatus::InProgress));
        assert!("done".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn test_missing_cost_reads_as_zero() {
        let incident: Incident = serde_json::from_str(
            r#"{"id":"i9","patientId":"p1","title":"Checkup","appointmentDate":"2025-07-01T10:00:00Z","status":"Completed"}"#,
        )
        .unwrap();
        assert_eq!(incident.cost, 0.0);
        assert_eq!(incident.billable_cost(), 0.0);
        assert!(incident.files.is_empty());
        assert!(incident.next_date.is_none());
    }

    #[test]
    fn test_naive_timestamps_are_accepted() {
        let incident: Incident = serde_json::from_str(
            r#"{"id":"i9","patientId":"p1","title":"Checkup","appointmentDate":"2025-07-01T10:00:00","nextDate":"","status":"Scheduled"}"#,
        )
        .unwrap();
        assert_eq!(incident.appointment_date, at(1));
        assert!(incident.next_date.is_none());

        let json = serde_json::to_value(&incident).unwrap();
        assert_eq!(json["appointmentDate"], "2025-07-01T10:00:00Z");
    }

    #[test]
    fn test_garbage_timestamp_is_rejected() {
        let result: Result<Incident, _> = serde_json::from_str(
            r#"{"id":"i9","patientId":"p1","title":"Checkup","appointmentDate":"soon"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_attachment_accepts_type_alias() {
        let file: Attachment = serde_json::from_str(
            r#"{"id":"f1","name":"invoice.pdf","url":"data:application/pdf;base64,sample","type":"application/pdf"}"#,
        )
        .unwrap();
        assert_eq!(file.mime_type, "application/pdf");
    }

    #[test]
    fn test_billable_cost() {
        let mut incident = Incident::from_fields("i1".into(), IncidentFields::new("p1", "X", at(2)));
        incident.cost = 450.0;
        assert_eq!(incident.billable_cost(), 450.0);
        incident.cost = -5.0;
        assert_eq!(incident.billable_cost(), 0.0);
        incident.cost = f64::NAN;
        assert_eq!(incident.billable_cost(), 0.0);
    }

    #[test]
    fn test_is_valid_cost() {
        assert!(is_valid_cost(0.0));
        assert!(is_valid_cost(120.5));
        assert!(!is_valid_cost(-1.0));
        assert!(!is_valid_cost(f64::INFINITY));
    }
}
