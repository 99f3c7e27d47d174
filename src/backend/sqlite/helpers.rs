//! Row conversion and transaction helpers for the SQLite backend.

use rusqlite::{Connection, types::Value};

use crate::{
    errors::StoreError,
    triple::{Node, Triple, XSD_INTEGER},
};

const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

/// Run `body` inside `BEGIN IMMEDIATE`/`COMMIT`, rolling back on error.
pub(super) fn with_transaction<T>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    conn.execute("BEGIN IMMEDIATE", [])?;
    match body(conn) {
        Ok(value) => {
            conn.execute("COMMIT", [])?;
            Ok(value)
        }
        Err(err) => {
            let _ = conn.execute("ROLLBACK", []);
            Err(err)
        }
    }
}

pub(super) fn row_to_triple(
    subject: String,
    predicate: String,
    object: String,
) -> Result<Triple, StoreError> {
    let decode = |text: &str| {
        Node::parse(text).map_err(|e| StoreError::backend(format!("corrupt stored term: {e}")))
    };
    Ok(Triple::new(
        decode(&subject)?,
        decode(&predicate)?,
        decode(&object)?,
    ))
}

/// Map a result cell to a node; text cells holding N-Triples terms decode to
/// that term, any other text becomes a plain literal.
pub(super) fn value_to_node(value: Value) -> Option<Node> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(Node::typed_literal(i.to_string(), XSD_INTEGER)),
        Value::Real(f) => Some(Node::typed_literal(f.to_string(), XSD_DOUBLE)),
        Value::Text(text) => Some(match Node::parse(&text) {
            Ok(node) => node,
            Err(_) => Node::literal(text),
        }),
        Value::Blob(bytes) => Some(Node::literal(String::from_utf8_lossy(&bytes).into_owned())),
    }
}

/// Strip a leading `ASK` keyword, case-insensitively.
pub(super) fn strip_ask(text: &str) -> Option<&str> {
    let head = text.get(..3)?;
    let rest = &text[3..];
    if head.eq_ignore_ascii_case("ask") && rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}
