//! Clinic-wide aggregates: revenue, per-patient rollups and the admin dashboard.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use super::{upcoming_window, Snapshot};
use crate::config::StoreConfig;
use crate::models::{Incident, Patient};

/// Statistics for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRollup<'a> {
    pub patient: &'a Patient,
    /// All incidents, whatever their status
    pub total_incidents: usize,
    /// Sum of Completed costs
    pub total_spent: f64,
    /// Latest Completed appointment
    pub last_visit: Option<DateTime<Utc>>,
}

/// Size limits for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardLimits {
    pub horizon: Duration,
    pub upcoming: usize,
    pub top_patients: usize,
}

impl Default for DashboardLimits {
    fn default() -> Self {
        Self::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for DashboardLimits {
    fn from(config: &StoreConfig) -> Self {
        Self {
            horizon: config.upcoming_horizon(),
            upcoming: config.upcoming_limit,
            top_patients: config.top_patients_limit,
        }
    }
}

/// Admin dashboard figures.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminDashboard<'a> {
    pub total_patients: usize,
    pub upcoming_appointments: Vec<&'a Incident>,
    pub completed_treatments: usize,
    /// Everything not Completed, cancelled included
    pub pending_treatments: usize,
    /// Completed revenue in the current month
    pub monthly_revenue: f64,
    pub top_patients: Vec<PatientRollup<'a>>,
}

/// `[first of month, first of next month)` in `zone`, as UTC instants.
pub fn month_bounds(
    zone: &FixedOffset,
    year: i32,
    month: u32,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    let start = zone
        .from_local_datetime(&first.and_hms_opt(0, 0, 0)?)
        .single()?;
    let end = zone
        .from_local_datetime(&next.and_hms_opt(0, 0, 0)?)
        .single()?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

/// Completed revenue for `year`-`month` in the snapshot's zone. Zero for an invalid month.
pub fn monthly_revenue(snapshot: &Snapshot<'_>, year: i32, month: u32) -> f64 {
    let Some((start, end)) = month_bounds(&snapshot.zone, year, month) else {
        return 0.0;
    };

    snapshot
        .incidents
        .iter()
        .filter(|i| i.is_completed())
        .filter(|i| i.appointment_date >= start && i.appointment_date < end)
        .map(Incident::billable_cost)
        .sum()
}

/// Completed revenue for the month containing `now`.
pub fn current_month_revenue(snapshot: &Snapshot<'_>) -> f64 {
    let today = snapshot.today();
    monthly_revenue(snapshot, today.year(), today.month())
}

/// Rollup for one patient record.
pub fn rollup_for<'a>(snapshot: &Snapshot<'a>, patient: &'a Patient) -> PatientRollup<'a> {
    let incidents = snapshot.incidents_for(&patient.id);
    let completed = incidents.iter().filter(|i| i.is_completed());

    PatientRollup {
        patient,
        total_incidents: incidents.len(),
        total_spent: completed.clone().map(|i| i.billable_cost()).sum(),
        last_visit: completed.map(|i| i.appointment_date).max(),
    }
}

/// Rollups for every patient, in collection order.
pub fn patient_rollups<'a>(snapshot: &Snapshot<'a>) -> Vec<PatientRollup<'a>> {
    snapshot
        .patients
        .iter()
        .map(|p| rollup_for(snapshot, p))
        .collect()
}

/// Order by spend descending, then name, then id.
pub fn rank_patients(rollups: &mut [PatientRollup<'_>]) {
    rollups.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| a.patient.name.cmp(&b.patient.name))
            .then_with(|| a.patient.id.cmp(&b.patient.id))
    });
}

/// The `limit` highest-spending patients.
pub fn top_patients<'a>(snapshot: &Snapshot<'a>, limit: usize) -> Vec<PatientRollup<'a>> {
    let mut rollups = patient_rollups(snapshot);
    rank_patients(&mut rollups);
    rollups.truncate(limit);
    rollups
}

/// Everything the admin dashboard shows.
pub fn admin_dashboard<'a>(snapshot: &Snapshot<'a>, limits: &DashboardLimits) -> AdminDashboard<'a> {
    let mut upcoming_appointments = upcoming_window(snapshot, limits.horizon);
    upcoming_appointments.truncate(limits.upcoming);

    let completed_treatments = snapshot.incidents.iter().filter(|i| i.is_completed()).count();

    AdminDashboard {
        total_patients: snapshot.patients.len(),
        upcoming_appointments,
        completed_treatments,
        pending_treatments: snapshot.incidents.len() - completed_treatments,
        monthly_revenue: current_month_revenue(snapshot),
        top_patients: top_patients(snapshot, limits.top_patients),
    }
}
