//! Principals and the credential directory.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Role of an authenticated principal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    /// Clinic staff with full record access
    Admin,
    /// A patient; read-only access to their own records
    Patient,
}

/// An authenticated session subject. Never carries a credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Linked patient record, set for `Role::Patient`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Patient id this principal is confined to, if any.
    ///
    /// A `Patient` principal without a linked record is confined to nothing;
    /// callers treat that as "no visible records".
    pub fn patient_scope(&self) -> Option<&str> {
        match self.role {
            Role::Admin => None,
            Role::Patient => Some(self.patient_id.as_deref().unwrap_or("")),
        }
    }

    /// Whether this principal may read records of `patient_id`.
    pub fn can_view_patient(&self, patient_id: &str) -> bool {
        match self.patient_scope() {
            None => true,
            Some(own) => !own.is_empty() && own == patient_id,
        }
    }
}

/// Entry in the persisted principal directory.
///
/// The secret is held as a hex SHA-256 digest; the plain secret is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub principal: Principal,
    pub secret_sha256: String,
}

impl DirectoryEntry {
    /// Create an entry, hashing `secret`.
    pub fn new(principal: Principal, secret: &str) -> Self {
        Self {
            principal,
            secret_sha256: secret_digest(secret),
        }
    }

    /// Exact, case-sensitive match on email and secret.
    pub fn matches(&self, email: &str, secret: &str) -> bool {
        self.principal.email == email && self.secret_sha256 == secret_digest(secret)
    }
}

/// Compute the hex SHA-256 digest of a secret.
pub fn secret_digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
