//! Tagged mutation commands and the pure state transition that applies them.
//!
//! `Command::apply` never touches persistence. The store persists the returned
//! state and only then swaps it in, which is what makes each mutation
//! all-or-nothing.

use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};
use crate::models::{is_valid_cost, Incident, IncidentFields, Patient, PatientFields};

/// Canonical record collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicState {
    pub patients: Vec<Patient>,
    pub incidents: Vec<Incident>,
}

impl ClinicState {
    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn incident(&self, id: &str) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id == id)
    }

    pub fn has_patient(&self, id: &str) -> bool {
        self.patient(id).is_some()
    }

    /// Incidents whose patient does not exist.
    pub fn orphaned_incidents(&self) -> impl Iterator<Item = &Incident> {
        self.incidents
            .iter()
            .filter(move |i| !self.has_patient(&i.patient_id))
    }
}

/// A mutation of the record collections.
///
/// Create commands carry the id the store assigned, so applying a command is
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreatePatient { id: String, fields: PatientFields },
    UpdatePatient(Patient),
    /// Removes the patient and every incident referencing it.
    DeletePatient(String),
    CreateIncident { id: String, fields: IncidentFields },
    UpdateIncident(Incident),
    DeleteIncident(String),
}

/// Collections a transition changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touched {
    pub patients: bool,
    pub incidents: bool,
}

/// What a command did, for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PatientSaved(Patient),
    PatientRemoved { id: String, incidents_removed: usize },
    IncidentSaved(Incident),
    IncidentRemoved(String),
}

/// Result of applying a command to a state.
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: ClinicState,
    pub touched: Touched,
    pub effect: Effect,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreatePatient { .. } => "create_patient",
            Command::UpdatePatient(_) => "update_patient",
            Command::DeletePatient(_) => "delete_patient",
            Command::CreateIncident { .. } => "create_incident",
            Command::UpdateIncident(_) => "update_incident",
            Command::DeleteIncident(_) => "delete_incident",
        }
    }

    /// Compute the state after this command. `state` is left untouched.
    pub fn apply(self, state: &ClinicState) -> StoreResult<Applied> {
        match self {
            Command::CreatePatient { id, fields } => {
                if state.has_patient(&id) {
                    return Err(StoreError::InvalidInput(format!("duplicate patient id: {id}")));
                }
                let patient = Patient::from_fields(id, fields);
                let mut next = state.clone();
                next.patients.push(patient.clone());
                Ok(Applied {
                    state: next,
                    touched: Touched { patients: true, incidents: false },
                    effect: Effect::PatientSaved(patient),
                })
            }

            Command::UpdatePatient(patient) => {
                let index = state
                    .patients
                    .iter()
                    .position(|p| p.id == patient.id)
                    .ok_or_else(|| StoreError::NotFound(format!("patient {}", patient.id)))?;
                let mut next = state.clone();
                next.patients[index] = patient.clone();
                Ok(Applied {
                    state: next,
                    touched: Touched { patients: true, incidents: false },
                    effect: Effect::PatientSaved(patient),
                })
            }

            Command::DeletePatient(id) => {
                if !state.has_patient(&id) {
                    return Err(StoreError::NotFound(format!("patient {id}")));
                }
                let mut next = state.clone();
                next.patients.retain(|p| p.id != id);
                let before = next.incidents.len();
                next.incidents.retain(|i| i.patient_id != id);
                let incidents_removed = before - next.incidents.len();
                Ok(Applied {
                    state: next,
                    touched: Touched {
                        patients: true,
                        incidents: incidents_removed > 0,
                    },
                    effect: Effect::PatientRemoved { id, incidents_removed },
                })
            }

            Command::CreateIncident { id, fields } => {
                if state.incident(&id).is_some() {
                    return Err(StoreError::InvalidInput(format!("duplicate incident id: {id}")));
                }
                check_incident_refs(state, &fields.patient_id, fields.cost)?;
                let incident = Incident::from_fields(id, fields);
                let mut next = state.clone();
                next.incidents.push(incident.clone());
                Ok(Applied {
                    state: next,
                    touched: Touched { patients: false, incidents: true },
                    effect: Effect::IncidentSaved(incident),
                })
            }

            Command::UpdateIncident(incident) => {
                let index = state
                    .incidents
                    .iter()
                    .position(|i| i.id == incident.id)
                    .ok_or_else(|| StoreError::NotFound(format!("incident {}", incident.id)))?;
                check_incident_refs(state, &incident.patient_id, incident.cost)?;
                let mut next = state.clone();
                next.incidents[index] = incident.clone();
                Ok(Applied {
                    state: next,
                    touched: Touched { patients: false, incidents: true },
                    effect: Effect::IncidentSaved(incident),
                })
            }

            Command::DeleteIncident(id) => {
                if state.incident(&id).is_none() {
                    return Err(StoreError::NotFound(format!("incident {id}")));
                }
                let mut next = state.clone();
                next.incidents.retain(|i| i.id != id);
                Ok(Applied {
                    state: next,
                    touched: Touched { patients: false, incidents: true },
                    effect: Effect::IncidentRemoved(id),
                })
            }
        }
    }
}

fn check_incident_refs(state: &ClinicState, patient_id: &str, cost: f64) -> StoreResult<()> {
    if !state.has_patient(patient_id) {
        return Err(StoreError::NotFound(format!("patient {patient_id}")));
    }
    if !is_valid_cost(cost) {
        return Err(StoreError::InvalidInput(format!(
            "cost must be a non-negative amount, got {cost}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IncidentStatus;
    use chrono::{TimeZone, Utc};

    fn state_with_patient() -> ClinicState {
        let applied = Command::CreatePatient {
            id: "p1".into(),
            fields: PatientFields::named("John Doe"),
        }
        .apply(&ClinicState::default())
        .unwrap();
        applied.state
    }

    fn incident_fields(patient_id: &str) -> IncidentFields {
        let mut fields = IncidentFields::new(
            patient_id,
            "Cleaning",
            Utc.with_ymd_and_hms(2025, 7, 15, 14, 0, 0).unwrap(),
        );
        fields.cost = 120.0;
        fields
    }

    #[test]
    fn test_create_patient() {
        let state = state_with_patient();
        assert_eq!(state.patients.len(), 1);
        assert_eq!(state.patients[0].id, "p1");
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let state = state_with_patient();
        let before = state.clone();
        let _ = Command::DeletePatient("p1".into()).apply(&state).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_duplicate_patient_id_rejected() {
        let state = state_with_patient();
        let result = Command::CreatePatient {
            id: "p1".into(),
            fields: PatientFields::named("Again"),
        }
        .apply(&state);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_update_missing_patient_is_not_found() {
        let state = state_with_patient();
        let mut ghost = state.patients[0].clone();
        ghost.id = "p404".into();
        let result = Command::UpdatePatient(ghost).apply(&state);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_delete_patient_cascades() {
        let state = state_with_patient();
        let state = Command::CreateIncident { id: "i1".into(), fields: incident_fields("p1") }
            .apply(&state)
            .unwrap()
            .state;
        let state = Command::CreateIncident { id: "i2".into(), fields: incident_fields("p1") }
            .apply(&state)
            .unwrap()
            .state;

        let applied = Command::DeletePatient("p1".into()).apply(&state).unwrap();
        assert!(applied.state.patients.is_empty());
        assert!(applied.state.incidents.is_empty());
        assert_eq!(applied.touched, Touched { patients: true, incidents: true });
        assert_eq!(
            applied.effect,
            Effect::PatientRemoved { id: "p1".into(), incidents_removed: 2 }
        );
    }

    #[test]
    fn test_delete_patient_without_incidents_touches_only_patients() {
        let state = state_with_patient();
        let applied = Command::DeletePatient("p1".into()).apply(&state).unwrap();
        assert_eq!(applied.touched, Touched { patients: true, incidents: false });
    }

    #[test]
    fn test_create_incident_requires_patient() {
        let state = state_with_patient();
        let result = Command::CreateIncident { id: "i1".into(), fields: incident_fields("p2") }
            .apply(&state);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_create_incident_rejects_negative_cost() {
        let state = state_with_patient();
        let mut fields = incident_fields("p1");
        fields.cost = -10.0;
        let result = Command::CreateIncident { id: "i1".into(), fields }.apply(&state);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_update_incident_cannot_orphan() {
        let state = state_with_patient();
        let applied = Command::CreateIncident { id: "i1".into(), fields: incident_fields("p1") }
            .apply(&state)
            .unwrap();
        let Effect::IncidentSaved(mut incident) = applied.effect else {
            panic!("expected saved incident");
        };

        incident.patient_id = "p2".into();
        let result = Command::UpdateIncident(incident).apply(&applied.state);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_update_incident_replaces_whole_record() {
        let state = state_with_patient();
        let applied = Command::CreateIncident { id: "i1".into(), fields: incident_fields("p1") }
            .apply(&state)
            .unwrap();
        let Effect::IncidentSaved(mut incident) = applied.effect else {
            panic!("expected saved incident");
        };

        incident.status = IncidentStatus::Completed;
        incident.comments = String::new();
        let next = Command::UpdateIncident(incident.clone())
            .apply(&applied.state)
            .unwrap()
            .state;
        assert_eq!(next.incident("i1"), Some(&incident));
    }

    #[test]
    fn test_delete_missing_incident_is_not_found() {
        let state = state_with_patient();
        let result = Command::DeleteIncident("i404".into()).apply(&state);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_orphaned_incidents() {
        let mut state = state_with_patient();
        let mut incident = Incident::from_fields("i1".into(), incident_fields("p1"));
        incident.patient_id = "gone".into();
        state.incidents.push(incident);
        assert_eq!(state.orphaned_incidents().count(), 1);
    }
}
