//! Triple value types.
//!
//! Nodes and triples are immutable values compared structurally. Terms render
//! and parse in N-Triples syntax so that every backend can store them as text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// A graph node: IRI, blank node or literal.
///
/// Serializes as its N-Triples term text.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Node {
    Iri(String),
    Blank(String),
    Literal {
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Node {
    pub fn iri(iri: impl Into<String>) -> Self {
        Node::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Node::Blank(label.into())
    }

    /// Plain literal without datatype or language tag.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Node::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Node::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Node::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Parse a single term in N-Triples syntax, decoding `\uXXXX` and
    /// `\UXXXXXXXX` escapes.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('<') {
            let iri = rest
                .strip_suffix('>')
                .ok_or_else(|| StoreError::invalid_input(format!("unterminated IRI: {text}")))?;
            if iri.contains(|ch: char| ch <= ' ' || ch == '<' || ch == '>') {
                return Err(StoreError::invalid_input(format!("malformed IRI: {text}")));
            }
            return Ok(Node::Iri(decode_unicode_escapes(iri, text)?));
        }
        if let Some(label) = text.strip_prefix("_:") {
            if label.contains(char::is_whitespace) {
                return Err(StoreError::invalid_input(format!("malformed blank node: {text}")));
            }
            return Ok(Node::Blank(decode_unicode_escapes(label, text)?));
        }
        if text.starts_with('"') {
            return parse_literal(text);
        }
        Err(StoreError::invalid_input(format!("unrecognised term: {text}")))
    }
}

/// Characters that cannot appear raw between `<` and `>`.
fn iri_needs_escape(ch: char) -> bool {
    ch <= ' ' || matches!(ch, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
}

fn label_needs_escape(ch: char) -> bool {
    ch.is_whitespace() || ch.is_control() || ch == '\\'
}

/// An IRI rendered as an N-Triples `IRIREF`.
pub(crate) struct IriRef<'a>(pub(crate) &'a str);

impl fmt::Display for IriRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        write_unicode_escaped(f, self.0, iri_needs_escape)?;
        f.write_str(">")
    }
}

fn write_unicode_escaped(
    f: &mut fmt::Formatter<'_>,
    text: &str,
    needs_escape: fn(char) -> bool,
) -> fmt::Result {
    for ch in text.chars() {
        if !needs_escape(ch) {
            write!(f, "{ch}")?;
        } else if (ch as u32) <= 0xFFFF {
            write!(f, "\\u{:04X}", ch as u32)?;
        } else {
            write!(f, "\\U{:08X}", ch as u32)?;
        }
    }
    Ok(())
}

fn decode_unicode_escapes(raw: &str, text: &str) -> Result<String, StoreError> {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        let width = match chars.next() {
            Some('u') => 4,
            Some('U') => 8,
            _ => {
                return Err(StoreError::invalid_input(format!(
                    "unsupported escape in term: {text}"
                )));
            }
        };
        let digits: String = chars.by_ref().take(width).collect();
        decoded.push(code_point(&digits, width, text)?);
    }
    Ok(decoded)
}

fn code_point(digits: &str, width: usize, text: &str) -> Result<char, StoreError> {
    if digits.len() != width || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(StoreError::invalid_input(format!("bad unicode escape in term: {text}")));
    }
    u32::from_str_radix(digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| StoreError::invalid_input(format!("bad code point in term: {text}")))
}

fn parse_literal(text: &str) -> Result<Node, StoreError> {
    let mut lexical = String::new();
    let mut chars = text[1..].char_indices();
    let mut end = None;
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| {
                    StoreError::invalid_input(format!("dangling escape in literal: {text}"))
                })?;
                lexical.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '"' => '"',
                    '\\' => '\\',
                    'u' | 'U' => {
                        let width = if escaped == 'u' { 4 } else { 8 };
                        let digits: String =
                            chars.by_ref().take(width).map(|(_, ch)| ch).collect();
                        code_point(&digits, width, text)?
                    }
                    other => {
                        return Err(StoreError::invalid_input(format!(
                            "unsupported escape \\{other} in literal"
                        )));
                    }
                });
            }
            '"' => {
                end = Some(idx + 2);
                break;
            }
            other => lexical.push(other),
        }
    }
    let end =
        end.ok_or_else(|| StoreError::invalid_input(format!("unterminated literal: {text}")))?;
    let suffix = &text[end..];
    if suffix.is_empty() {
        return Ok(Node::literal(lexical));
    }
    if let Some(language) = suffix.strip_prefix('@') {
        if language.is_empty() {
            return Err(StoreError::invalid_input(format!("empty language tag: {text}")));
        }
        return Ok(Node::lang_literal(lexical, language));
    }
    if let Some(datatype) = suffix.strip_prefix("^^") {
        return match Node::parse(datatype)? {
            Node::Iri(iri) => Ok(Node::typed_literal(lexical, iri)),
            _ => Err(StoreError::invalid_input(format!(
                "literal datatype must be an IRI: {text}"
            ))),
        };
    }
    Err(StoreError::invalid_input(format!("trailing input after literal: {text}")))
}

fn write_escaped(f: &mut fmt::Formatter<'_>, lexical: &str) -> fmt::Result {
    for ch in lexical.chars() {
        match ch {
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            other => write!(f, "{other}")?,
        }
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "{}", IriRef(iri)),
            Node::Blank(label) => {
                f.write_str("_:")?;
                write_unicode_escaped(f, label, label_needs_escape)
            }
            Node::Literal {
                lexical,
                datatype,
                language,
            } => {
                f.write_str("\"")?;
                write_escaped(f, lexical)?;
                f.write_str("\"")?;
                if let Some(language) = language {
                    write!(f, "@{language}")
                } else if let Some(datatype) = datatype {
                    write!(f, "^^{}", IriRef(datatype))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl From<Node> for String {
    fn from(node: Node) -> Self {
        node.to_string()
    }
}

impl TryFrom<String> for Node {
    type Error = StoreError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Node::parse(&text)
    }
}

/// An immutable (subject, predicate, object) statement.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// A triple is ground when none of its nodes is a blank node.
    pub fn is_ground(&self) -> bool {
        !(self.subject.is_blank() || self.predicate.is_blank() || self.object.is_blank())
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
