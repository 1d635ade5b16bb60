//! Patient models.

use serde::{Deserialize, Serialize};

/// A patient record.
///
/// Descriptive fields are free text and may be empty. `id` is assigned by the
/// store at creation time and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Store-assigned identifier
    pub id: String,
    /// Full name
    #[serde(default)]
    pub name: String,
    /// Date of birth as entered (usually `YYYY-MM-DD`)
    #[serde(default, alias = "dob")]
    pub date_of_birth: String,
    /// Phone number
    #[serde(default)]
    pub contact: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Postal address
    #[serde(default)]
    pub address: String,
    /// Allergies, history and other clinical notes
    #[serde(default)]
    pub health_info: String,
}

/// Caller-supplied fields for a new patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientFields {
    pub name: String,
    pub date_of_birth: String,
    pub contact: String,
    pub email: String,
    pub address: String,
    pub health_info: String,
}

impl PatientFields {
    /// Fields with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Patient {
    /// Build a patient record from fields and a store-assigned id.
    pub fn from_fields(id: String, fields: PatientFields) -> Self {
        Self {
            id,
            name: fields.name,
            date_of_birth: fields.date_of_birth,
            contact: fields.contact,
            email: fields.email,
            address: fields.address,
            health_info: fields.health_info,
        }
    }

    /// Whether this patient matches a search query.
    ///
    /// Name and email match case-insensitively; contact matches verbatim.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
            || self.contact.contains(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Patient {
        Patient::from_fields(
            "p1".into(),
            PatientFields {
                name: "John Doe".into(),
                date_of_birth: "1990-05-10".into(),
                contact: "1234567890".into(),
                email: "john@entnt.in".into(),
                address: "123 Main St, City".into(),
                health_info: "No known allergies.".into(),
            },
        )
    }

    #[test]
    fn test_from_fields() {
        let patient = sample();
        assert_eq!(patient.id, "p1");
        assert_eq!(patient.name, "John Doe");
        assert_eq!(patient.health_info, "No known allergies.");
    }

    #[test]
    fn test_matches_query() {
        let patient = sample();
        assert!(patient.matches_query("john"));
        assert!(patient.matches_query("ENTNT"));
        assert!(patient.matches_query("4567"));
        assert!(patient.matches_query(""));
        assert!(!patient.matches_query("jane"));
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["dateOfBirth"], "1990-05-10");
        assert_eq!(json["healthInfo"], "No known allergies.");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let patient: Patient = serde_json::from_str(r#"{"id":"p9","name":"Ann","dob":"2001-01-01"}"#).unwrap();
        assert_eq!(patient.date_of_birth, "2001-01-01");
        assert_eq!(patient.contact, "");
    }
}
