//! Patient-scoped views: overview, history and search.

use chrono::{DateTime, Utc};

use super::{chronological, reverse_chronological, Snapshot};
use crate::models::{Incident, Patient};

/// Everything one patient's dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientOverview<'a> {
    /// `None` when the id does not name a patient
    pub patient: Option<&'a Patient>,
    pub incidents: Vec<&'a Incident>,
    /// Not yet past, earliest first
    pub upcoming: Vec<&'a Incident>,
    /// Past or completed, latest first
    pub past: Vec<&'a Incident>,
    pub total_spent: f64,
    pub next_appointment: Option<&'a Incident>,
    pub total_treatments: usize,
    pub completed_treatments: usize,
}

/// An incident is past once its appointment is before `now` or it is Completed,
/// even when a completed appointment is dated in the future.
pub fn is_past(incident: &Incident, now: DateTime<Utc>) -> bool {
    incident.appointment_date < now || incident.is_completed()
}

/// Overview of one patient at the snapshot's `now`.
pub fn patient_overview<'a>(snapshot: &Snapshot<'a>, patient_id: &str) -> PatientOverview<'a> {
    let incidents = snapshot.incidents_for(patient_id);

    let (mut past, mut upcoming): (Vec<&'a Incident>, Vec<&'a Incident>) = incidents
        .iter()
        .copied()
        .partition(|i| is_past(i, snapshot.now));
    upcoming.sort_by(chronological);
    past.sort_by(reverse_chronological);

    let completed: Vec<&&'a Incident> = incidents.iter().filter(|i| i.is_completed()).collect();

    PatientOverview {
        patient: snapshot.patient(patient_id),
        total_spent: completed.iter().map(|i| i.billable_cost()).sum(),
        completed_treatments: completed.len(),
        total_treatments: incidents.len(),
        next_appointment: upcoming.first().copied(),
        incidents,
        upcoming,
        past,
    }
}

/// One patient's incidents, latest first.
pub fn patient_history<'a>(snapshot: &Snapshot<'a>, patient_id: &str) -> Vec<&'a Incident> {
    let mut history = snapshot.incidents_for(patient_id);
    history.sort_by(reverse_chronological);
    history
}

/// Patients matching `query`; all of them for a blank query.
pub fn search_patients<'a>(patients: &'a [Patient], query: &str) -> Vec<&'a Patient> {
    if query.is_empty() {
        return patients.iter().collect();
    }
    patients.iter().filter(|p| p.matches_query(query)).collect()
}
