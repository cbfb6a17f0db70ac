//! Database schema for the SQLite sinks

/// SQL schema for the results database
pub const SCHEMA_SQL: &str = r#"
-- One row per scanned drug dosage page
CREATE TABLE IF NOT EXISTS drugs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    link TEXT NOT NULL,
    dosage TEXT NOT NULL,
    manufacturer TEXT NOT NULL,
    inn TEXT NOT NULL,
    pharm_group TEXT NOT NULL,
    registration TEXT NOT NULL,
    atc_code TEXT NOT NULL,
    instruction TEXT NOT NULL,
    scanned_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_drugs_link ON drugs(link);

-- The ATC classification as a single JSON document
CREATE TABLE IF NOT EXISTS atc_tree (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document TEXT NOT NULL,
    node_count INTEGER NOT NULL,
    scanned_at TEXT NOT NULL
);
"#;

pub(crate) const INSERT_DRUG: &str = "INSERT INTO drugs
    (name, link, dosage, manufacturer, inn, pharm_group, registration, atc_code, instruction, scanned_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

pub(crate) const INSERT_TREE: &str =
    "INSERT INTO atc_tree (document, node_count, scanned_at) VALUES (?1, ?2, ?3)";

/// Creates the tables if they do not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
