//! Derived views over a read-only snapshot of the records.
//!
//! Everything here is a pure function of `(patients, incidents, now, zone)`:
//! no persistence access, no mutation, no failure modes. Unknown patient ids
//! produce empty results.

mod calendar;
mod dashboard;
mod patient;

pub use calendar::*;
pub use dashboard::*;
pub use patient::*;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::cmp::Ordering;

use crate::models::{Incident, Patient};

/// Borrowed records plus the clock and calendar zone to evaluate them at.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub patients: &'a [Patient],
    pub incidents: &'a [Incident],
    pub now: DateTime<Utc>,
    /// Zone that decides which calendar day a timestamp falls on
    pub zone: FixedOffset,
}

impl<'a> Snapshot<'a> {
    /// Snapshot with calendar dates in UTC.
    pub fn new(patients: &'a [Patient], incidents: &'a [Incident], now: DateTime<Utc>) -> Self {
        Self {
            patients,
            incidents,
            now,
            zone: Utc.fix(),
        }
    }

    pub fn with_zone(mut self, zone: FixedOffset) -> Self {
        self.zone = zone;
        self
    }

    /// Calendar date of `ts` in the snapshot's zone.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.zone).date_naive()
    }

    /// Today's date in the snapshot's zone.
    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now)
    }

    pub fn patient(&self, id: &str) -> Option<&'a Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Incidents of one patient, in collection order.
    pub fn incidents_for(&self, patient_id: &str) -> Vec<&'a Incident> {
        self.incidents
            .iter()
            .filter(|i| i.patient_id == patient_id)
            .collect()
    }
}

/// Ascending by appointment date, ties by id.
pub fn chronological(a: &&Incident, b: &&Incident) -> Ordering {
    a.appointment_date
        .cmp(&b.appointment_date)
        .then_with(|| a.id.cmp(&b.id))
}

/// Descending by appointment date, ties by id ascending.
pub fn reverse_chronological(a: &&Incident, b: &&Incident) -> Ordering {
    b.appointment_date
        .cmp(&a.appointment_date)
        .then_with(|| a.id.cmp(&b.id))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::{Incident, IncidentStatus};

    #[test]
    fn test_local_date_uses_zone() {
        let patients = [patient("p1", "Ann")];
        let incidents: Vec<Incident> = Vec::new();
        let late = at(7, 1, 22);

        let utc = Snapshot::new(&patients, &incidents, late);
        assert_eq!(utc.local_date(late), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());

        let plus_three = utc.with_zone(FixedOffset::east_opt(3 * 3600).unwrap());
        assert_eq!(plus_three.local_date(late), NaiveDate::from_ymd_opt(2025, 7, 2).unwrap());
    }

    #[test]
    fn test_incidents_for() {
        let patients = [patient("p1", "Ann"), patient("p2", "Bob")];
        let incidents = [
            incident("i1", "p1", at(7, 1, 9), 0.0, IncidentStatus::Scheduled),
            incident("i2", "p2", at(7, 2, 9), 0.0, IncidentStatus::Scheduled),
        ];
        let snapshot = Snapshot::new(&patients, &incidents, at(7, 1, 0));
        assert_eq!(snapshot.incidents_for("p1").len(), 1);
        assert_eq!(snapshot.incidents_for("p404").len(), 0);
        assert!(snapshot.patient("p404").is_none());
    }
}
