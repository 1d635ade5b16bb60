//! Clinic Records Core Library
//!
//! Local-first patient and appointment records for a small dental clinic.
//!
//! # Architecture
//!
//! ```text
//!   login / restore ──► SessionState ──► Access gate
//!                                           │
//!   create / update / delete ──► Command ──► apply (pure)
//!                                           │
//!                              write_batch (KeyValueStore)
//!                                           │
//!                                  commit in-memory state
//!                                           │
//!                      Snapshot ──► calendar / dashboard / patient views
//! ```
//!
//! # Core Principle
//!
//! **Memory never runs ahead of storage.** A mutation is committed to the
//! in-memory collections only after every key it touched has been persisted.
//!
//! # Modules
//!
//! - [`db`]: Key-value persistence adapters (in-memory, SQLite)
//! - [`models`]: Domain types (Patient, Incident, Principal, etc.)
//! - [`store`]: Domain store, command reducer and bootstrap dataset
//! - [`session`]: Session state and role-based access
//! - [`views`]: Derived read-only views (calendar, dashboards, history)
//! - [`config`]: Store configuration

pub mod config;
pub mod db;
pub mod models;
pub mod session;
pub mod store;
pub mod views;

// Re-export commonly used types
pub use config::StoreConfig;
pub use db::{DbError, KeyValueStore, MemoryStore, SqliteStore};
pub use models::{
    Attachment, Incident, IncidentFields, IncidentStatus, Patient, PatientFields, Principal, Role,
};
pub use session::{visible_incidents, Access, SessionState};
pub use store::{Command, DomainStore, Effect, StoreError, StoreResult};
pub use views::Snapshot;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use models::timestamp;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<StoreError> for ClinicError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidCredentials => ClinicError::InvalidCredentials,
            StoreError::NotFound(what) => ClinicError::NotFound(what),
            StoreError::InvalidInput(msg) => ClinicError::InvalidInput(msg),
            StoreError::Unauthenticated => ClinicError::Unauthenticated,
            StoreError::Forbidden(msg) => ClinicError::Forbidden(msg),
            StoreError::Persistence(e) => ClinicError::PersistenceError(e.to_string()),
            StoreError::Serialization(e) => ClinicError::SerializationError(e.to_string()),
        }
    }
}

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        ClinicError::PersistenceError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::PersistenceError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a clinic database at the given path.
#[uniffi::export]
pub fn open_clinic(path: String) -> Result<Arc<ClinicCore>, ClinicError> {
    ClinicCore::open(SqliteStore::open(&path)?, StoreConfig::default())
}

/// Open a clinic database with a JSON configuration document.
#[uniffi::export]
pub fn open_clinic_with_config(
    path: String,
    config_json: String,
) -> Result<Arc<ClinicCore>, ClinicError> {
    let config = StoreConfig::from_json(&config_json)?;
    ClinicCore::open(SqliteStore::open(&path)?, config)
}

/// Create an in-memory clinic (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory() -> Result<Arc<ClinicCore>, ClinicError> {
    ClinicCore::open(SqliteStore::open_in_memory()?, StoreConfig::default())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    store: Arc<Mutex<DomainStore<SqliteStore>>>,
}

impl ClinicCore {
    fn open(kv: SqliteStore, config: StoreConfig) -> Result<Arc<Self>, ClinicError> {
        let mut store = DomainStore::with_config(kv, config);
        store.initialize()?;
        Ok(Arc::new(Self {
            store: Arc::new(Mutex::new(store)),
        }))
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Reload persisted collections, seeding an empty database.
    pub fn initialize(&self) -> Result<(), ClinicError> {
        let mut store = self.store.lock()?;
        store.initialize()?;
        Ok(())
    }

    /// Sign in with email and secret.
    pub fn login(&self, email: String, secret: String) -> Result<FfiPrincipal, ClinicError> {
        let mut store = self.store.lock()?;
        let principal = store.authenticate(&email, &secret)?;
        Ok(principal.into())
    }

    /// Resume the persisted session, if any.
    pub fn restore_session(&self) -> Result<Option<FfiPrincipal>, ClinicError> {
        let mut store = self.store.lock()?;
        let principal = store.restore_session()?;
        Ok(principal.map(|p| p.into()))
    }

    pub fn logout(&self) -> Result<(), ClinicError> {
        let mut store = self.store.lock()?;
        store.end_session()?;
        Ok(())
    }

    pub fn current_principal(&self) -> Result<Option<FfiPrincipal>, ClinicError> {
        let store = self.store.lock()?;
        Ok(store.principal().cloned().map(|p| p.into()))
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Patients visible to the signed-in principal.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, ClinicError> {
        let store = self.store.lock()?;
        let principal = store.principal().ok_or(StoreError::Unauthenticated)?;
        Ok(store
            .patients()
            .iter()
            .filter(|p| principal.can_view_patient(&p.id))
            .map(|p| p.into())
            .collect())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, ClinicError> {
        let store = self.store.lock()?;
        store.authorize(Access::Patient(&patient_id))?;
        Ok(store.state().patient(&patient_id).map(|p| p.into()))
    }

    /// Search patients by name, email or contact.
    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, ClinicError> {
        let store = self.store.lock()?;
        store.authorize(Access::ClinicWide)?;
        let found = views::search_patients(store.patients(), &query);
        Ok(found.into_iter().map(|p| p.into()).collect())
    }

    pub fn create_patient(&self, fields: FfiPatientFields) -> Result<FfiPatient, ClinicError> {
        let mut store = self.store.lock()?;
        let patient = store.create_patient(fields.into())?;
        Ok((&patient).into())
    }

    pub fn update_patient(&self, patient: FfiPatient) -> Result<FfiPatient, ClinicError> {
        let mut store = self.store.lock()?;
        let patient = store.update_patient(patient.into())?;
        Ok((&patient).into())
    }

    /// Delete a patient and its incidents. Returns the number of incidents removed.
    pub fn delete_patient(&self, patient_id: String) -> Result<u32, ClinicError> {
        let mut store = self.store.lock()?;
        let removed = store.delete_patient(&patient_id)?;
        Ok(removed as u32)
    }

    // =========================================================================
    // Incident Operations
    // =========================================================================

    /// Incidents visible to the signed-in principal.
    pub fn list_incidents(&self) -> Result<Vec<FfiIncident>, ClinicError> {
        let store = self.store.lock()?;
        let principal = store.principal().ok_or(StoreError::Unauthenticated)?;
        let visible = visible_incidents(Some(principal), store.incidents());
        Ok(visible.into_iter().map(|i| i.into()).collect())
    }

    /// A patient's incidents, latest first.
    pub fn patient_history(&self, patient_id: String) -> Result<Vec<FfiIncident>, ClinicError> {
        let store = self.store.lock()?;
        store.authorize(Access::Patient(&patient_id))?;
        let snapshot = store.snapshot(Utc::now());
        let history = views::patient_history(&snapshot, &patient_id);
        Ok(history.into_iter().map(|i| i.into()).collect())
    }

    pub fn create_incident(&self, fields: FfiIncidentFields) -> Result<FfiIncident, ClinicError> {
        let mut store = self.store.lock()?;
        let fields = fields.into_fields(&store.config().reference_zone())?;
        let incident = store.create_incident(fields)?;
        Ok((&incident).into())
    }

    pub fn update_incident(&self, incident: FfiIncident) -> Result<FfiIncident, ClinicError> {
        let mut store = self.store.lock()?;
        let incident = incident.into_incident(&store.config().reference_zone())?;
        let incident = store.update_incident(incident)?;
        Ok((&incident).into())
    }

    pub fn delete_incident(&self, incident_id: String) -> Result<(), ClinicError> {
        let mut store = self.store.lock()?;
        store.delete_incident(&incident_id)?;
        Ok(())
    }

    // =========================================================================
    // Dashboard Operations
    // =========================================================================

    /// Admin dashboard at `now` (RFC 3339), or at the current time.
    pub fn admin_dashboard(&self, now: Option<String>) -> Result<FfiAdminDashboard, ClinicError> {
        let store = self.store.lock()?;
        let now = parse_now(now, &store.config().reference_zone())?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(now);
        let limits = views::DashboardLimits::from(store.config());
        Ok(views::admin_dashboard(&snapshot, &limits).into())
    }

    /// Appointments in the configured upcoming window.
    pub fn upcoming_appointments(&self, now: Option<String>) -> Result<Vec<FfiIncident>, ClinicError> {
        let store = self.store.lock()?;
        let now = parse_now(now, &store.config().reference_zone())?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(now);
        let upcoming = views::upcoming_window(&snapshot, store.config().upcoming_horizon());
        Ok(upcoming.into_iter().map(|i| i.into()).collect())
    }

    /// One patient's overview at `now` (RFC 3339), or at the current time.
    pub fn patient_overview(
        &self,
        patient_id: String,
        now: Option<String>,
    ) -> Result<FfiPatientOverview, ClinicError> {
        let store = self.store.lock()?;
        let now = parse_now(now, &store.config().reference_zone())?;
        store.authorize(Access::Patient(&patient_id))?;
        let snapshot = store.snapshot(now);
        Ok(views::patient_overview(&snapshot, &patient_id).into())
    }

    // =========================================================================
    // Calendar Operations
    // =========================================================================

    /// Incidents on a `YYYY-MM-DD` date.
    pub fn calendar_day(&self, date: String, now: Option<String>) -> Result<FfiCalendarDay, ClinicError> {
        let date = parse_date(&date)?;
        let store = self.store.lock()?;
        let now = parse_now(now, &store.config().reference_zone())?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(now);
        let incidents = views::incidents_on(&snapshot, date);
        Ok(FfiCalendarDay {
            date: date.to_string(),
            is_today: date == snapshot.today(),
            incidents: incidents.into_iter().map(|i| i.into()).collect(),
        })
    }

    /// Every day of a month with its incidents.
    pub fn calendar_month(
        &self,
        year: i32,
        month: u32,
        now: Option<String>,
    ) -> Result<Vec<FfiCalendarDay>, ClinicError> {
        if !(1..=12).contains(&month) {
            return Err(ClinicError::InvalidInput(format!("month out of range: {month}")));
        }
        let store = self.store.lock()?;
        let now = parse_now(now, &store.config().reference_zone())?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(now);
        let grid = views::month_grid(&snapshot, year, month);
        Ok(grid.into_iter().map(|d| d.into()).collect())
    }

    /// The Sunday-started week containing a `YYYY-MM-DD` date.
    pub fn calendar_week(
        &self,
        date: String,
        now: Option<String>,
    ) -> Result<Vec<FfiCalendarDay>, ClinicError> {
        let date = parse_date(&date)?;
        let store = self.store.lock()?;
        let now = parse_now(now, &store.config().reference_zone())?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(now);
        let grid = views::week_grid(&snapshot, date);
        Ok(grid.into_iter().map(|d| d.into()).collect())
    }

    /// Appointment counts for the calendar header; `this_month` covers `year`-`month`.
    pub fn calendar_stats(&self, year: i32, month: u32) -> Result<FfiCalendarStats, ClinicError> {
        if !(1..=12).contains(&month) {
            return Err(ClinicError::InvalidInput(format!("month out of range: {month}")));
        }
        let store = self.store.lock()?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(Utc::now());
        Ok(views::calendar_stats(&snapshot, year, month).into())
    }

    /// Display name for a patient id, `"Unknown Patient"` when absent.
    pub fn patient_name(&self, patient_id: String) -> Result<String, ClinicError> {
        let store = self.store.lock()?;
        store.authorize(Access::ClinicWide)?;
        let snapshot = store.snapshot(Utc::now());
        Ok(views::patient_name(&snapshot, &patient_id).to_string())
    }
}

// =========================================================================
// Parsing Helpers
// =========================================================================

/// RFC 3339, or a naive date-time in the store's reference zone.
fn parse_timestamp(value: &str, zone: &FixedOffset) -> Result<DateTime<Utc>, ClinicError> {
    timestamp::parse_in_zone(value, zone)
        .ok_or_else(|| ClinicError::InvalidInput(format!("bad timestamp {value:?}")))
}

/// Blank follow-up dates read as none.
fn parse_optional_timestamp(
    value: Option<&str>,
    zone: &FixedOffset,
) -> Result<Option<DateTime<Utc>>, ClinicError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => parse_timestamp(raw, zone).map(Some),
        _ => Ok(None),
    }
}

fn parse_now(now: Option<String>, zone: &FixedOffset) -> Result<DateTime<Utc>, ClinicError> {
    match now {
        Some(value) => parse_timestamp(&value, zone),
        None => Ok(Utc::now()),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ClinicError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ClinicError::InvalidInput(format!("bad date {value:?}: {e}")))
}

fn parse_status(value: &str) -> Result<IncidentStatus, ClinicError> {
    value.parse().map_err(ClinicError::InvalidInput)
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe principal.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrincipal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub patient_id: Option<String>,
}

impl From<Principal> for FfiPrincipal {
    fn from(principal: Principal) -> Self {
        Self {
            is_admin: principal.is_admin(),
            id: principal.id,
            name: principal.name,
            email: principal.email,
            patient_id: principal.patient_id,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub date_of_birth: String,
    pub contact: String,
    pub email: String,
    pub address: String,
    pub health_info: String,
}

impl From<&Patient> for FfiPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            name: patient.name.clone(),
            date_of_birth: patient.date_of_birth.clone(),
            contact: patient.contact.clone(),
            email: patient.email.clone(),
            address: patient.address.clone(),
            health_info: patient.health_info.clone(),
        }
    }
}

impl From<FfiPatient> for Patient {
    fn from(patient: FfiPatient) -> Self {
        Patient {
            id: patient.id,
            name: patient.name,
            date_of_birth: patient.date_of_birth,
            contact: patient.contact,
            email: patient.email,
            address: patient.address,
            health_info: patient.health_info,
        }
    }
}

/// FFI-safe fields for a new patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientFields {
    pub name: String,
    pub date_of_birth: String,
    pub contact: String,
    pub email: String,
    pub address: String,
    pub health_info: String,
}

impl From<FfiPatientFields> for PatientFields {
    fn from(fields: FfiPatientFields) -> Self {
        PatientFields {
            name: fields.name,
            date_of_birth: fields.date_of_birth,
            contact: fields.contact,
            email: fields.email,
            address: fields.address,
            health_info: fields.health_info,
        }
    }
}

/// FFI-safe attachment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAttachment {
    pub id: String,
    pub name: String,
    pub url: String,
    pub mime_type: String,
}

impl From<&Attachment> for FfiAttachment {
    fn from(file: &Attachment) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            url: file.url.clone(),
            mime_type: file.mime_type.clone(),
        }
    }
}

impl From<FfiAttachment> for Attachment {
    fn from(file: FfiAttachment) -> Self {
        Attachment {
            id: file.id,
            name: file.name,
            url: file.url,
            mime_type: file.mime_type,
        }
    }
}

/// FFI-safe incident. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIncident {
    pub id: String,
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
    pub treatment: String,
    pub appointment_date: String,
    pub next_date: Option<String>,
    pub cost: f64,
    pub status: String,
    pub files: Vec<FfiAttachment>,
}

impl From<&Incident> for FfiIncident {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            patient_id: incident.patient_id.clone(),
            title: incident.title.clone(),
            description: incident.description.clone(),
            comments: incident.comments.clone(),
            treatment: incident.treatment.clone(),
            appointment_date: incident.appointment_date.to_rfc3339(),
            next_date: incident.next_date.map(|d| d.to_rfc3339()),
            cost: incident.cost,
            status: incident.status.to_string(),
            files: incident.files.iter().map(|f| f.into()).collect(),
        }
    }
}

impl FfiIncident {
    /// Timestamps without an offset are read in `zone`.
    fn into_incident(self, zone: &FixedOffset) -> Result<Incident, ClinicError> {
        Ok(Incident {
            appointment_date: parse_timestamp(&self.appointment_date, zone)?,
            next_date: parse_optional_timestamp(self.next_date.as_deref(), zone)?,
            status: parse_status(&self.status)?,
            id: self.id,
            patient_id: self.patient_id,
            title: self.title,
            description: self.description,
            comments: self.comments,
            treatment: self.treatment,
            cost: self.cost,
            files: self.files.into_iter().map(|f| f.into()).collect(),
        })
    }
}

/// FFI-safe fields for a new incident.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIncidentFields {
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
    pub treatment: String,
    pub appointment_date: String,
    pub next_date: Option<String>,
    pub cost: f64,
    pub status: String,
}

impl FfiIncidentFields {
    fn into_fields(self, zone: &FixedOffset) -> Result<IncidentFields, ClinicError> {
        Ok(IncidentFields {
            appointment_date: parse_timestamp(&self.appointment_date, zone)?,
            next_date: parse_optional_timestamp(self.next_date.as_deref(), zone)?,
            status: parse_status(&self.status)?,
            patient_id: self.patient_id,
            title: self.title,
            description: self.description,
            comments: self.comments,
            treatment: self.treatment,
            cost: self.cost,
            files: Vec::new(),
        })
    }
}

/// FFI-safe calendar counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCalendarStats {
    pub total_appointments: u32,
    pub this_month: u32,
    pub completed: u32,
    pub pending: u32,
}

impl From<views::CalendarStats> for FfiCalendarStats {
    fn from(stats: views::CalendarStats) -> Self {
        Self {
            total_appointments: stats.total_appointments as u32,
            this_month: stats.this_month as u32,
            completed: stats.completed as u32,
            pending: stats.pending as u32,
        }
    }
}

/// FFI-safe patient rollup.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRollup {
    pub patient: FfiPatient,
    pub total_incidents: u32,
    pub total_spent: f64,
    pub last_visit: Option<String>,
}

impl From<views::PatientRollup<'_>> for FfiPatientRollup {
    fn from(rollup: views::PatientRollup<'_>) -> Self {
        Self {
            patient: rollup.patient.into(),
            total_incidents: rollup.total_incidents as u32,
            total_spent: rollup.total_spent,
            last_visit: rollup.last_visit.map(|d| d.to_rfc3339()),
        }
    }
}

/// FFI-safe admin dashboard.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdminDashboard {
    pub total_patients: u32,
    pub upcoming_appointments: Vec<FfiIncident>,
    pub completed_treatments: u32,
    pub pending_treatments: u32,
    pub monthly_revenue: f64,
    pub top_patients: Vec<FfiPatientRollup>,
}

impl From<views::AdminDashboard<'_>> for FfiAdminDashboard {
    fn from(dashboard: views::AdminDashboard<'_>) -> Self {
        Self {
            total_patients: dashboard.total_patients as u32,
            upcoming_appointments: dashboard
                .upcoming_appointments
                .into_iter()
                .map(|i| i.into())
                .collect(),
            completed_treatments: dashboard.completed_treatments as u32,
            pending_treatments: dashboard.pending_treatments as u32,
            monthly_revenue: dashboard.monthly_revenue,
            top_patients: dashboard.top_patients.into_iter().map(|r| r.into()).collect(),
        }
    }
}

/// FFI-safe patient overview.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientOverview {
    pub patient: Option<FfiPatient>,
    pub upcoming: Vec<FfiIncident>,
    pub past: Vec<FfiIncident>,
    pub total_spent: f64,
    pub next_appointment: Option<FfiIncident>,
    pub total_treatments: u32,
    pub completed_treatments: u32,
}

impl From<views::PatientOverview<'_>> for FfiPatientOverview {
    fn from(overview: views::PatientOverview<'_>) -> Self {
        Self {
            patient: overview.patient.map(|p| p.into()),
            upcoming: overview.upcoming.into_iter().map(|i| i.into()).collect(),
            past: overview.past.into_iter().map(|i| i.into()).collect(),
            total_spent: overview.total_spent,
            next_appointment: overview.next_appointment.map(|i| i.into()),
            total_treatments: overview.total_treatments as u32,
            completed_treatments: overview.completed_treatments as u32,
        }
    }
}

/// FFI-safe calendar day.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCalendarDay {
    /// `YYYY-MM-DD`
    pub date: String,
    pub is_today: bool,
    pub incidents: Vec<FfiIncident>,
}

impl From<views::CalendarDay<'_>> for FfiCalendarDay {
    fn from(day: views::CalendarDay<'_>) -> Self {
        Self {
            date: day.date.to_string(),
            is_today: day.is_today,
            incidents: day.incidents.into_iter().map(|i| i.into()).collect(),
        }
    }
}
