//! SQLite reference backend.
//!
//! Graphs live in two tables: `store_graphs` records graph names (so empty
//! graphs exist) and `store_triples` holds one row per triple with every
//! node stored as N-Triples term text. Graphs are keyed by
//! [`GraphName::to_key`]. The backend's native query language
//! is SQL over those tables; `ASK <select>` evaluates to a boolean.

mod helpers;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rusqlite::{Connection, OpenFlags, params, types::Value};

use super::{Capabilities, QueryResult, ResultSet, StoreBackend};
use crate::{errors::StoreError, graph::GraphName, schema::ensure_schema, triple::Triple};

use helpers::{row_to_triple, strip_ask, value_to_node, with_transaction};

pub struct SqliteTripleBackend {
    conn: Connection,
}

// Main database has no backing file.
fn is_in_memory_connection(conn: &Connection) -> bool {
    match conn.pragma_query_value(None, "database_list", |row| {
        let name: String = row.get(2)?;
        Ok(name)
    }) {
        Ok(file) => file.is_empty() || file == ":memory:",
        Err(_) => true,
    }
}

impl SqliteTripleBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::backend(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Open an existing database file, failing when it does not exist.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::backend(e.to_string()))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::backend(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.set_prepared_statement_cache_capacity(64);
        if !is_in_memory_connection(&conn) {
            if conn.pragma_update(None, "journal_mode", "WAL").is_err() {
                let _ = conn.pragma_update(None, "journal_mode", "DELETE");
            }
            let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        }
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn graph_exists(&self, key: &str) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM store_graphs WHERE name=?1)
                 OR EXISTS(SELECT 1 FROM store_triples WHERE graph=?1)",
            params![key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

fn insert_triples(
    conn: &Connection,
    key: &str,
    triples: &BTreeSet<Triple>,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO store_triples(graph, subject, predicate, object) VALUES(?1, ?2, ?3, ?4)",
    )?;
    for triple in triples {
        stmt.execute(params![
            key,
            triple.subject.to_string(),
            triple.predicate.to_string(),
            triple.object.to_string(),
        ])?;
    }
    Ok(())
}

fn register_graph(conn: &Connection, key: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO store_graphs(name) VALUES(?1)",
        params![key],
    )?;
    Ok(())
}

impl StoreBackend for SqliteTripleBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn load_graph(&self, name: &GraphName) -> Result<BTreeSet<Triple>, StoreError> {
        let key = name.to_key();
        if !self.graph_exists(&key)? {
            return Err(StoreError::not_found(name.to_string()));
        }
        let mut stmt = self.conn.prepare_cached(
            "SELECT subject, predicate, object FROM store_triples WHERE graph=?1",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut triples = BTreeSet::new();
        for row in rows {
            let (subject, predicate, object) = row?;
            triples.insert(row_to_triple(subject, predicate, object)?);
        }
        Ok(triples)
    }

    fn save_graph(&self, name: &GraphName, triples: &BTreeSet<Triple>) -> Result<(), StoreError> {
        let key = name.to_key();
        with_transaction(&self.conn, |conn| {
            conn.execute("DELETE FROM store_triples WHERE graph=?1", params![key])?;
            register_graph(conn, &key)?;
            insert_triples(conn, &key, triples)
        })
    }

    fn update_graph(
        &self,
        name: &GraphName,
        additions: &BTreeSet<Triple>,
        removals: &BTreeSet<Triple>,
    ) -> Result<(), StoreError> {
        let key = name.to_key();
        with_transaction(&self.conn, |conn| {
            register_graph(conn, &key)?;
            let mut delete = conn.prepare_cached(
                "DELETE FROM store_triples WHERE graph=?1 AND subject=?2 AND predicate=?3 AND object=?4",
            )?;
            for triple in removals {
                delete.execute(params![
                    key,
                    triple.subject.to_string(),
                    triple.predicate.to_string(),
                    triple.object.to_string(),
                ])?;
            }
            insert_triples(conn, &key, additions)
        })
    }

    fn delete_graph(&self, name: &GraphName) -> Result<(), StoreError> {
        let key = name.to_key();
        with_transaction(&self.conn, |conn| {
            conn.execute("DELETE FROM store_triples WHERE graph=?1", params![key])?;
            conn.execute("DELETE FROM store_graphs WHERE name=?1", params![key])?;
            Ok(())
        })
    }

    fn list_graph_names(&self) -> Result<Vec<GraphName>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name FROM store_graphs UNION SELECT graph FROM store_triples",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for key in rows {
            let key = key?;
            names.push(
                GraphName::from_key(&key)
                    .map_err(|e| StoreError::backend(format!("corrupt graph key: {e}")))?,
            );
        }
        names.sort();
        Ok(names)
    }

    fn has_graph(&self, name: &GraphName) -> Result<bool, StoreError> {
        self.graph_exists(&name.to_key())
    }

    fn query(&self, text: &str) -> Result<QueryResult, StoreError> {
        let text = text.trim();
        if let Some(inner) = strip_ask(text) {
            let exists: bool =
                self.conn
                    .query_row(&format!("SELECT EXISTS({inner})"), [], |row| row.get(0))?;
            return Ok(QueryResult::Boolean(exists));
        }
        let mut stmt = self.conn.prepare(text)?;
        if !stmt.readonly() {
            return Err(StoreError::invalid_input(
                "query text must be a read-only statement",
            ));
        }
        let variables: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = stmt.query([])?;
        let mut results = ResultSet {
            variables: variables.clone(),
            rows: Vec::new(),
        };
        while let Some(row) = rows.next()? {
            let mut bindings = BTreeMap::new();
            for (idx, variable) in variables.iter().enumerate() {
                let value: Value = row.get(idx)?;
                if let Some(node) = value_to_node(value) {
                    bindings.insert(variable.clone(), node);
                }
            }
            results.rows.push(bindings);
        }
        Ok(QueryResult::Bindings(results))
    }

    fn update(&self, text: &str) -> Result<(), StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::invalid_input("update text is empty"));
        }
        self.conn.execute_batch(text)?;
        Ok(())
    }
}
