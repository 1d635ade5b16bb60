//! Property tests for the domain store.

use chrono::{Duration, TimeZone, Utc};
use clinic_records_core::db::{KeyValueStore, MemoryStore};
use clinic_records_core::models::{
    DirectoryEntry, Incident, IncidentFields, IncidentStatus, Patient, PatientFields, Principal, Role,
};
use clinic_records_core::store::DomainStore;
use clinic_records_core::StoreConfig;
use proptest::prelude::*;
use proptest::test_runner::Config;

#[derive(Debug, Clone)]
enum Op {
    AddPatient(String),
    AddIncident { patient: usize, hours: i64, cost: u32, completed: bool },
    DeletePatient(usize),
    DeleteIncident(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[A-Za-z ]{1,12}".prop_map(Op::AddPatient),
        (0..8usize, 0..2000i64, 0..1000u32, any::<bool>()).prop_map(
            |(patient, hours, cost, completed)| Op::AddIncident { patient, hours, cost, completed }
        ),
        (0..8usize).prop_map(Op::DeletePatient),
        (0..16usize).prop_map(Op::DeleteIncident),
    ]
}

/// No records, one admin login.
fn empty_store() -> DomainStore<MemoryStore> {
    let admin = Principal {
        id: "1".into(),
        name: "Admin".into(),
        email: "admin@clinic.test".into(),
        role: Role::Admin,
        patient_id: None,
    };
    let mut kv = MemoryStore::new();
    let directory = vec![DirectoryEntry::new(admin, "pw")];
    kv.write("principals", &serde_json::to_vec(&directory).unwrap()).unwrap();

    let config = StoreConfig {
        seed_on_first_run: false,
        ..StoreConfig::default()
    };
    let mut store = DomainStore::with_config(kv, config);
    store.initialize().unwrap();
    store.authenticate("admin@clinic.test", "pw").unwrap();
    store
}

fn run(store: &mut DomainStore<MemoryStore>, op: &Op) {
    let base = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
    match op {
        Op::AddPatient(name) => {
            store.create_patient(PatientFields::named(name.clone())).unwrap();
        }
        Op::AddIncident { patient, hours, cost, completed } => {
            let Some(owner) = store.patients().get(*patient).map(|p| p.id.clone()) else {
                return;
            };
            let mut fields = IncidentFields::new(owner, "Visit", base + Duration::hours(*hours));
            fields.cost = f64::from(*cost);
            if *completed {
                fields.status = IncidentStatus::Completed;
            }
            store.create_incident(fields).unwrap();
        }
        Op::DeletePatient(index) => {
            if let Some(id) = store.patients().get(*index).map(|p| p.id.clone()) {
                store.delete_patient(&id).unwrap();
            }
        }
        Op::DeleteIncident(index) => {
            if let Some(id) = store.incidents().get(*index).map(|i| i.id.clone()) {
                store.delete_incident(&id).unwrap();
            }
        }
    }
}

fn persisted<T: serde::de::DeserializeOwned>(kv: &MemoryStore, key: &str) -> Vec<T> {
    kv.read(key)
        .unwrap()
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
        .unwrap_or_default()
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn storage_mirrors_memory_after_every_mutation(ops in prop::collection::vec(op(), 1..24)) {
        let mut store = empty_store();
        for op in &ops {
            run(&mut store, op);
            let patients: Vec<Patient> = persisted(store.kv(), "patients");
            let incidents: Vec<Incident> = persisted(store.kv(), "incidents");
            prop_assert_eq!(patients.as_slice(), store.patients());
            prop_assert_eq!(incidents.as_slice(), store.incidents());
        }
    }

    #[test]
    fn every_incident_has_a_patient(ops in prop::collection::vec(op(), 1..24)) {
        let mut store = empty_store();
        for op in &ops {
            run(&mut store, op);
        }
        for incident in store.incidents() {
            prop_assert!(store.state().has_patient(&incident.patient_id));
        }
    }

    #[test]
    fn deleting_a_patient_removes_its_incidents(
        ops in prop::collection::vec(op(), 1..24),
        victim in 0..8usize,
    ) {
        let mut store = empty_store();
        for op in &ops {
            run(&mut store, op);
        }
        let Some(id) = store.patients().get(victim).map(|p| p.id.clone()) else {
            return Ok(());
        };
        let owned = store.incidents().iter().filter(|i| i.patient_id == id).count();
        let others = store.incidents().len() - owned;

        let removed = store.delete_patient(&id).unwrap();
        prop_assert_eq!(removed, owned);
        prop_assert_eq!(store.incidents().len(), others);
        prop_assert!(store.incidents().iter().all(|i| i.patient_id != id));
    }

    #[test]
    fn created_ids_are_distinct(names in prop::collection::vec("[a-z]{1,4}", 1..20)) {
        let mut store = empty_store();
        let mut ids = std::collections::HashSet::new();
        for name in names {
            let patient = store.create_patient(PatientFields::named(name)).unwrap();
            prop_assert!(ids.insert(patient.id));
        }
    }
}
