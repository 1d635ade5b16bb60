//! Domain store: the single owner of patient, incident and session state.
//!
//! Every mutation goes through [`Command::apply`] to compute the next state,
//! writes the touched collections to the key-value adapter in one batch, and
//! only then replaces the in-memory state. A failed write leaves both memory
//! and storage as they were.

mod command;
mod seed;

pub use command::*;
pub use seed::*;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StoreConfig, INCIDENTS_KEY, PATIENTS_KEY, PRINCIPALS_KEY, SESSION_KEY};
use crate::db::{DbError, KeyValueStore};
use crate::models::timestamp::{has_offset, parse_in_zone};
use crate::models::{DirectoryEntry, Incident, IncidentFields, Patient, PatientFields, Principal};
use crate::session::{Access, SessionState};
use crate::views::Snapshot;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
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
    Persistence(#[from] DbError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-process store over a key-value adapter.
pub struct DomainStore<S: KeyValueStore> {
    kv: S,
    config: StoreConfig,
    state: ClinicState,
    session: SessionState,
}

impl<S: KeyValueStore> DomainStore<S> {
    /// Create a store with default configuration. Call [`initialize`](Self::initialize) next.
    pub fn new(kv: S) -> Self {
        Self::with_config(kv, StoreConfig::default())
    }

    pub fn with_config(kv: S, config: StoreConfig) -> Self {
        Self {
            kv,
            config,
            state: ClinicState::default(),
            session: SessionState::Anonymous,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Seed the adapter on first run, otherwise load persisted collections.
    ///
    /// Seeding happens only when none of the patient, incident or principal keys
    /// exist. Safe to call repeatedly.
    pub fn initialize(&mut self) -> StoreResult<()> {
        let patients_key = self.config.key(PATIENTS_KEY);
        let incidents_key = self.config.key(INCIDENTS_KEY);
        let principals_key = self.config.key(PRINCIPALS_KEY);

        let mut has_data = false;
        for key in [&patients_key, &incidents_key, &principals_key] {
            if self.kv.read(key)?.is_some() {
                has_data = true;
                break;
            }
        }

        if !has_data && self.config.seed_on_first_run {
            let seed = bootstrap()?;
            self.kv.write_batch(&[
                (principals_key, serde_json::to_vec(&seed.directory)?),
                (patients_key, serde_json::to_vec(&seed.state.patients)?),
                (incidents_key, serde_json::to_vec(&seed.state.incidents)?),
            ])?;
            tracing::info!(
                patients = seed.state.patients.len(),
                incidents = seed.state.incidents.len(),
                principals = seed.directory.len(),
                "seeded bootstrap dataset"
            );
            self.state = seed.state;
            return Ok(());
        }

        let (incidents, localized) = self.load_incidents(&incidents_key)?.unwrap_or_default();
        let mut loaded = ClinicState {
            patients: self.load(&patients_key)?.unwrap_or_default(),
            incidents,
        };

        let orphans = loaded.orphaned_incidents().count();
        if orphans > 0 {
            let patients = &loaded.patients;
            loaded
                .incidents
                .retain(|i| patients.iter().any(|p| p.id == i.patient_id));
            tracing::warn!(removed = orphans, "pruned incidents without a patient");
        }
        if localized > 0 {
            tracing::info!(localized, "rewrote timestamps without offset in the reference zone");
        }
        if orphans > 0 || localized > 0 {
            self.kv
                .write(&incidents_key, &serde_json::to_vec(&loaded.incidents)?)?;
        }

        tracing::info!(
            patients = loaded.patients.len(),
            incidents = loaded.incidents.len(),
            "loaded persisted records"
        );
        self.state = loaded;
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Look up a principal by exact email and secret and start a session.
    ///
    /// Nothing is written when the credentials do not match.
    pub fn authenticate(&mut self, email: &str, secret: &str) -> StoreResult<Principal> {
        let directory: Vec<DirectoryEntry> = self
            .load(&self.config.key(PRINCIPALS_KEY))?
            .unwrap_or_default();

        let Some(entry) = directory.iter().find(|e| e.matches(email, secret)) else {
            tracing::warn!("authentication failed");
            return Err(StoreError::InvalidCredentials);
        };

        let principal = entry.principal.clone();
        self.kv.write(
            &self.config.key(SESSION_KEY),
            &serde_json::to_vec(&principal)?,
        )?;
        tracing::info!(principal_id = %principal.id, role = ?principal.role, "session started");
        self.session = SessionState::Authenticated(principal.clone());
        Ok(principal)
    }

    /// Resume a persisted session without re-checking credentials.
    pub fn restore_session(&mut self) -> StoreResult<Option<Principal>> {
        let principal: Option<Principal> = self.load(&self.config.key(SESSION_KEY))?;
        match &principal {
            Some(p) => {
                tracing::info!(principal_id = %p.id, "session restored");
                self.session = SessionState::Authenticated(p.clone());
            }
            None => self.session = SessionState::Anonymous,
        }
        Ok(principal)
    }

    /// Forget the current session. Records are untouched.
    pub fn end_session(&mut self) -> StoreResult<()> {
        self.kv.delete(&self.config.key(SESSION_KEY))?;
        if let Some(principal) = self.session.principal() {
            tracing::info!(principal_id = %principal.id, "session ended");
        }
        self.session = SessionState::Anonymous;
        Ok(())
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.session.principal()
    }

    /// Check `access` against the current session.
    pub fn authorize(&self, access: Access<'_>) -> StoreResult<&Principal> {
        self.session.authorize(access)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a patient with a fresh id.
    pub fn create_patient(&mut self, fields: PatientFields) -> StoreResult<Patient> {
        let id = self.fresh_id("p");
        match self.dispatch(Command::CreatePatient { id, fields })? {
            Effect::PatientSaved(patient) => Ok(patient),
            other => Err(unexpected(other)),
        }
    }

    /// Replace the patient with the same id.
    pub fn update_patient(&mut self, patient: Patient) -> StoreResult<Patient> {
        match self.dispatch(Command::UpdatePatient(patient))? {
            Effect::PatientSaved(patient) => Ok(patient),
            other => Err(unexpected(other)),
        }
    }

    /// Delete a patient and all of its incidents. Returns how many incidents went with it.
    pub fn delete_patient(&mut self, id: &str) -> StoreResult<usize> {
        match self.dispatch(Command::DeletePatient(id.to_string()))? {
            Effect::PatientRemoved { incidents_removed, .. } => Ok(incidents_removed),
            other => Err(unexpected(other)),
        }
    }

    /// Create an incident with a fresh id and no attachments.
    pub fn create_incident(&mut self, fields: IncidentFields) -> StoreResult<Incident> {
        let id = self.fresh_id("i");
        match self.dispatch(Command::CreateIncident { id, fields })? {
            Effect::IncidentSaved(incident) => Ok(incident),
            other => Err(unexpected(other)),
        }
    }

    /// Replace the incident with the same id.
    pub fn update_incident(&mut self, incident: Incident) -> StoreResult<Incident> {
        match self.dispatch(Command::UpdateIncident(incident))? {
            Effect::IncidentSaved(incident) => Ok(incident),
            other => Err(unexpected(other)),
        }
    }

    pub fn delete_incident(&mut self, id: &str) -> StoreResult<()> {
        match self.dispatch(Command::DeleteIncident(id.to_string()))? {
            Effect::IncidentRemoved(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Apply a command, persist the collections it touched, then commit it to memory.
    ///
    /// Requires an admin session; anyone else gets `Unauthenticated` or
    /// `Forbidden` and nothing changes.
    pub fn dispatch(&mut self, command: Command) -> StoreResult<Effect> {
        let name = command.name();
        if let Err(err) = self.session.authorize(Access::ManageRecords) {
            tracing::warn!(command = name, error = %err, "command refused");
            return Err(err);
        }

        let applied = match command.apply(&self.state) {
            Ok(applied) => applied,
            Err(err) => {
                tracing::warn!(command = name, error = %err, "command rejected");
                return Err(err);
            }
        };

        let mut entries = Vec::with_capacity(2);
        if applied.touched.patients {
            entries.push((
                self.config.key(PATIENTS_KEY),
                serde_json::to_vec(&applied.state.patients)?,
            ));
        }
        if applied.touched.incidents {
            entries.push((
                self.config.key(INCIDENTS_KEY),
                serde_json::to_vec(&applied.state.incidents)?,
            ));
        }

        tracing::debug!(command = name, keys = entries.len(), "persisting batch");
        if let Err(err) = self.kv.write_batch(&entries) {
            tracing::warn!(command = name, error = %err, "persistence failed; state rolled back");
            return Err(err.into());
        }

        self.state = applied.state;
        tracing::info!(
            command = name,
            patients = self.state.patients.len(),
            incidents = self.state.incidents.len(),
            "command committed"
        );
        Ok(applied.effect)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn patients(&self) -> &[Patient] {
        &self.state.patients
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.state.incidents
    }

    pub fn state(&self) -> &ClinicState {
        &self.state
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Borrow the underlying adapter.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Give back the adapter, dropping in-memory state.
    pub fn into_kv(self) -> S {
        self.kv
    }

    /// Read-only view of the current records at `now`, in the configured zone.
    ///
    /// The snapshot borrows the store, so no mutation can run while it is alive.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot<'_> {
        Snapshot::new(&self.state.patients, &self.state.incidents, now)
            .with_zone(self.config.reference_zone())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.kv.read(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load incidents, reading offset-less timestamps as reference-zone local time.
    ///
    /// Also returns how many timestamps had no offset.
    fn load_incidents(&self, key: &str) -> StoreResult<Option<(Vec<Incident>, usize)>> {
        let Some(mut records) = self.load::<Vec<serde_json::Value>>(key)? else {
            return Ok(None);
        };

        let zone = self.config.reference_zone();
        let mut localized = 0;
        for record in &mut records {
            for field in ["appointmentDate", "nextDate"] {
                let Some(slot) = record.get_mut(field) else {
                    continue;
                };
                let Some(raw) = slot.as_str() else {
                    continue;
                };
                if has_offset(raw) {
                    continue;
                }
                if let Some(ts) = parse_in_zone(raw, &zone) {
                    *slot = serde_json::Value::String(ts.to_rfc3339());
                    localized += 1;
                }
            }
        }

        let incidents = records
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Incident>, _>>()?;
        Ok(Some((incidents, localized)))
    }

    /// Random ids; collisions with existing records are retried.
    fn fresh_id(&self, prefix: &str) -> String {
        loop {
            let id = format!("{prefix}-{}", Uuid::new_v4());
            let taken = self.state.has_patient(&id) || self.state.incident(&id).is_some();
            if !taken {
                return id;
            }
        }
    }
}

fn unexpected(effect: Effect) -> StoreError {
    StoreError::InvalidInput(format!("unexpected command effect: {effect:?}"))
}
