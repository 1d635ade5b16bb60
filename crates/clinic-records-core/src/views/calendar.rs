//! Calendar views: date bucketing, month and week grids, upcoming window.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

use super::{chronological, month_bounds, Snapshot};
use crate::models::{Incident, IncidentStatus};

/// Shown when an incident's patient cannot be found.
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// One day cell of a calendar grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    pub is_today: bool,
    /// Incidents on this date, chronological
    pub incidents: Vec<&'a Incident>,
}

/// Counts shown beside the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarStats {
    pub total_appointments: usize,
    /// Appointments inside the displayed month
    pub this_month: usize,
    pub completed: usize,
    /// Neither Completed nor Cancelled
    pub pending: usize,
}

/// Group incidents by the calendar date of their appointment.
///
/// Each bucket is chronological.
pub fn bucket_by_date<'a>(snapshot: &Snapshot<'a>) -> BTreeMap<NaiveDate, Vec<&'a Incident>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&'a Incident>> = BTreeMap::new();
    for incident in snapshot.incidents {
        buckets
            .entry(snapshot.local_date(incident.appointment_date))
            .or_default()
            .push(incident);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by(chronological);
    }
    buckets
}

/// Incidents whose appointment falls on `date`.
pub fn incidents_on<'a>(snapshot: &Snapshot<'a>, date: NaiveDate) -> Vec<&'a Incident> {
    let mut found: Vec<&'a Incident> = snapshot
        .incidents
        .iter()
        .filter(|i| snapshot.local_date(i.appointment_date) == date)
        .collect();
    found.sort_by(chronological);
    found
}

/// Incidents strictly after `now` and strictly before `now + horizon`, chronological.
pub fn upcoming_window<'a>(snapshot: &Snapshot<'a>, horizon: Duration) -> Vec<&'a Incident> {
    let end = snapshot.now + horizon;
    let mut found: Vec<&'a Incident> = snapshot
        .incidents
        .iter()
        .filter(|i| i.appointment_date > snapshot.now && i.appointment_date < end)
        .collect();
    found.sort_by(chronological);
    found
}

/// Every day of `year`-`month` with its incidents. Empty for an invalid month.
pub fn month_grid<'a>(snapshot: &Snapshot<'a>, year: i32, month: u32) -> Vec<CalendarDay<'a>> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };

    let buckets = bucket_by_date(snapshot);
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| day_cell(snapshot, &buckets, date))
        .collect()
}

/// The Sunday-started week containing `date`.
pub fn week_grid<'a>(snapshot: &Snapshot<'a>, date: NaiveDate) -> Vec<CalendarDay<'a>> {
    let offset = i64::from(date.weekday().num_days_from_sunday());
    let start = date - Duration::days(offset);

    let buckets = bucket_by_date(snapshot);
    start
        .iter_days()
        .take(7)
        .map(|day| day_cell(snapshot, &buckets, day))
        .collect()
}

/// Quick stats for a calendar showing `year`-`month`.
///
/// Unlike the admin dashboard's pending count, cancelled incidents are not
/// pending here. An invalid month counts nothing for `this_month`.
pub fn calendar_stats(snapshot: &Snapshot<'_>, year: i32, month: u32) -> CalendarStats {
    let incidents = snapshot.incidents;
    let this_month = month_bounds(&snapshot.zone, year, month).map_or(0, |(start, end)| {
        incidents
            .iter()
            .filter(|i| i.appointment_date >= start && i.appointment_date < end)
            .count()
    });

    CalendarStats {
        total_appointments: incidents.len(),
        this_month,
        completed: incidents.iter().filter(|i| i.is_completed()).count(),
        pending: incidents
            .iter()
            .filter(|i| !matches!(i.status, IncidentStatus::Completed | IncidentStatus::Cancelled))
            .count(),
    }
}

/// Display name of a patient, or [`UNKNOWN_PATIENT`].
pub fn patient_name<'a>(snapshot: &Snapshot<'a>, patient_id: &str) -> &'a str {
    snapshot
        .patient(patient_id)
        .map(|p| p.name.as_str())
        .unwrap_or(UNKNOWN_PATIENT)
}

fn day_cell<'a>(
    snapshot: &Snapshot<'a>,
    buckets: &BTreeMap<NaiveDate, Vec<&'a Incident>>,
    date: NaiveDate,
) -> CalendarDay<'a> {
    CalendarDay {
        date,
        is_today: date == snapshot.today(),
        incidents: buckets.get(&date).cloned().unwrap_or_default(),
    }
}
