use rusqlite::{Connection, OptionalExtension};

use crate::errors::StoreError;

pub const BASE_SCHEMA_VERSION: i64 = 1;

struct MigrationStep {
    target_version: i64,
    statements: &'static [&'static str],
}

const MIGRATION_STEPS: &[MigrationStep] = &[MigrationStep {
    target_version: 2,
    statements: &["CREATE INDEX IF NOT EXISTS idx_triples_object ON store_triples(object)"],
}];

pub const SCHEMA_VERSION: i64 = BASE_SCHEMA_VERSION + MIGRATION_STEPS.len() as i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: i64,
    pub to_version: i64,
    pub statements: Vec<&'static str>,
}

pub fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    ensure_base_schema(conn)?;
    ensure_meta(conn)?;
    run_pending_migrations(conn)?;
    Ok(())
}

fn ensure_base_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_graphs (
            name TEXT PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS store_triples (
            graph     TEXT NOT NULL,
            subject   TEXT NOT NULL,
            predicate TEXT NOT NULL,
            object    TEXT NOT NULL,
            PRIMARY KEY (graph, subject, predicate, object)
        );
        CREATE INDEX IF NOT EXISTS idx_triples_predicate ON store_triples(predicate);
        CREATE TABLE IF NOT EXISTS store_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StoreError::schema(e.to_string()))
}

pub fn read_schema_version(conn: &Connection) -> Result<i64, StoreError> {
    conn.query_row(
        "SELECT schema_version FROM store_meta WHERE id=1",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::schema(e.to_string()))
}

pub fn run_pending_migrations(conn: &Connection) -> Result<MigrationReport, StoreError> {
    let current = read_schema_version(conn)?;
    let mut statements: Vec<&'static str> = Vec::new();
    let mut target = current;
    for step in MIGRATION_STEPS {
        if step.target_version > current {
            target = step.target_version;
            statements.extend_from_slice(step.statements);
        }
    }
    if statements.is_empty() {
        return Ok(MigrationReport {
            from_version: current,
            to_version: current,
            statements,
        });
    }
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| StoreError::schema(e.to_string()))?;
    let result: Result<(), StoreError> = (|| {
        for sql in statements.iter().copied() {
            conn.execute(sql, [])
                .map_err(|e| StoreError::schema(e.to_string()))?;
        }
        conn.execute(
            "UPDATE store_meta SET schema_version=?1 WHERE id=1",
            [target],
        )
        .map_err(|e| StoreError::schema(e.to_string()))?;
        Ok(())
    })();
    match result {
        Ok(()) => {
            conn.execute("COMMIT", [])
                .map_err(|e| StoreError::schema(e.to_string()))?;
        }
        Err(err) => {
            let _ = conn.execute("ROLLBACK", []);
            return Err(err);
        }
    }
    tracing::debug!(from = current, to = target, "applied schema migrations");
    Ok(MigrationReport {
        from_version: current,
        to_version: target,
        statements,
    })
}

fn ensure_meta(conn: &Connection) -> Result<(), StoreError> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT schema_version FROM store_meta WHERE id=1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::schema(e.to_string()))?;
    match version {
        Some(existing) => {
            if existing > SCHEMA_VERSION {
                return Err(StoreError::schema(format!(
                    "database schema version {existing} is newer than supported {SCHEMA_VERSION}"
                )));
            }
        }
        None => {
            conn.execute(
                "INSERT INTO store_meta(id, schema_version) VALUES(1, ?1)",
                [BASE_SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::schema(e.to_string()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_ensure_schema_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        let report = run_pending_migrations(&conn).unwrap();
        assert_eq!(report.from_version, report.to_version);
        assert!(report.statements.is_empty());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "UPDATE store_meta SET schema_version=?1 WHERE id=1",
            [SCHEMA_VERSION + 1],
        )
        .unwrap();
        let err = ensure_schema(&conn).unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
    }
}
