//! SQLite schema definition.

/// Schema for the SQLite-backed key-value adapter.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key-Value Entries
-- ============================================================================

CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,                          -- JSON document bytes
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
