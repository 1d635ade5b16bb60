//! Session state and role-based access gate.
//!
//! `Anonymous → Authenticated` happens only through a successful
//! authentication (or restoring a persisted one); `Authenticated → Anonymous`
//! only through ending the session. While authenticated, the principal's role
//! decides what may be read or changed:
//!
//! | Access                 | Admin | Patient            |
//! |------------------------|-------|--------------------|
//! | `ManageRecords`        | yes   | no                 |
//! | `ClinicWide`           | yes   | no                 |
//! | `Patient(id)`          | yes   | only its own `id`  |

use crate::models::{Incident, Principal};
use crate::store::{StoreError, StoreResult};

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

/// Something a caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<'a> {
    /// Create, update or delete patients and incidents
    ManageRecords,
    /// Clinic-wide reads: all patients, dashboards, calendar
    ClinicWide,
    /// Reads confined to one patient's records
    Patient(&'a str),
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(principal) => Some(principal),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// Check `access` against the current principal and return it.
    pub fn authorize(&self, access: Access<'_>) -> StoreResult<&Principal> {
        let principal = self.principal().ok_or(StoreError::Unauthenticated)?;
        let allowed = match access {
            Access::ManageRecords | Access::ClinicWide => principal.is_admin(),
            Access::Patient(patient_id) => principal.can_view_patient(patient_id),
        };

        if allowed {
            Ok(principal)
        } else {
            tracing::warn!(principal_id = %principal.id, ?access, "access denied");
            Err(StoreError::Forbidden(format!("{access:?}")))
        }
    }
}

/// Incidents `principal` may see: all for an admin, its own for a patient,
/// none without a session.
pub fn visible_incidents<'a>(
    principal: Option<&Principal>,
    incidents: &'a [Incident],
) -> Vec<&'a Incident> {
    match principal {
        None => Vec::new(),
        Some(principal) => incidents
            .iter()
            .filter(|i| principal.can_view_patient(&i.patient_id))
            .collect(),
    }
}
