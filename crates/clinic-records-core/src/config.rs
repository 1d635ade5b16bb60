//! Store configuration.

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{StoreError, StoreResult};

/// Logical key for the patient collection.
pub const PATIENTS_KEY: &str = "patients";
/// Logical key for the incident collection.
pub const INCIDENTS_KEY: &str = "incidents";
/// Logical key for the principal directory.
pub const PRINCIPALS_KEY: &str = "principals";
/// Logical key for the current session principal.
pub const SESSION_KEY: &str = "session";

const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;
const MAX_HORIZON_DAYS: i64 = 3650;

/// Tunables for the domain store and its dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix for persisted keys (`<namespace>_<key>`)
    pub namespace: Option<String>,
    /// Offset of the reference time zone used for calendar dates
    pub utc_offset_minutes: i32,
    /// Length of the "upcoming appointments" window
    pub upcoming_horizon_days: i64,
    /// Maximum upcoming appointments on the admin dashboard
    pub upcoming_limit: usize,
    /// Maximum ranked patients on the admin dashboard
    pub top_patients_limit: usize,
    /// Write the bootstrap dataset when the store is empty
    pub seed_on_first_run: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            utc_offset_minutes: 0,
            upcoming_horizon_days: 7,
            upcoming_limit: 10,
            top_patients_limit: 5,
            seed_on_first_run: true,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a JSON configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> StoreResult<()> {
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(StoreError::InvalidInput(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        if !(0..=MAX_HORIZON_DAYS).contains(&self.upcoming_horizon_days) {
            return Err(StoreError::InvalidInput(format!(
                "upcoming_horizon_days out of range: {}",
                self.upcoming_horizon_days
            )));
        }
        if let Some(namespace) = &self.namespace {
            if namespace.trim().is_empty() {
                return Err(StoreError::InvalidInput("namespace cannot be blank".into()));
            }
        }
        Ok(())
    }

    /// Reference time zone for calendar bucketing. Out-of-range offsets fall back to UTC.
    pub fn reference_zone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn upcoming_horizon(&self) -> Duration {
        Duration::days(self.upcoming_horizon_days.clamp(0, MAX_HORIZON_DAYS))
    }

    /// Physical key for a logical key.
    pub fn key(&self, logical: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}_{logical}"),
            None => logical.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.upcoming_horizon(), Duration::days(7));
        assert_eq!(config.reference_zone(), Utc.fix());
        assert_eq!(config.key(PATIENTS_KEY), "patients");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            StoreConfig::from_json(r#"{"namespace":"dentalApp","utc_offset_minutes":330}"#).unwrap();
        assert_eq!(config.key(SESSION_KEY), "dentalApp_session");
        assert_eq!(config.reference_zone().local_minus_utc(), 330 * 60);
        assert_eq!(config.upcoming_limit, 10);
        assert!(config.seed_on_first_run);
    }

    #[test]
    fn test_rejects_bad_offset() {
        let result = StoreConfig::from_json(r#"{"utc_offset_minutes":1440}"#);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_blank_namespace() {
        let result = StoreConfig::from_json(r#"{"namespace":"  "}"#);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = StoreConfig::from_json("{not json");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
