//! A JSON tree document.
//!
//! The engine treats documents as opaque; this is the concrete tree the
//! built-in operation catalog edits. Nodes are addressed with RFC 6901 JSON
//! pointers such as `/info/title` or `/servers/0/url`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A mutable JSON tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonDocument {
    root: Value,
}

impl JsonDocument {
    /// Create a document with an empty object root.
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing JSON value.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map(Self::from_value)
            .map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.root).map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Look up a node by JSON pointer.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.root.pointer(path)
    }

    pub(crate) fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    pub(crate) fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        self.root.pointer_mut(path)
    }
}

impl Default for JsonDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Value> for JsonDocument {
    fn from(root: Value) -> Self {
        Self::from_value(root)
    }
}

/// Split a pointer into its parent pointer and unescaped final token.
///
/// The root pointer `""` has no parent.
pub fn split_pointer(path: &str) -> Option<(&str, String)> {
    if !path.starts_with('/') {
        return None;
    }
    let idx = path.rfind('/')?;
    Some((&path[..idx], unescape_token(&path[idx + 1..])))
}

/// Unescaped reference tokens of a pointer; `None` if malformed.
pub fn pointer_tokens(path: &str) -> Option<Vec<String>> {
    if path.is_empty() {
        return Some(Vec::new());
    }
    let rest = path.strip_prefix('/')?;
    Some(rest.split('/').map(unescape_token).collect())
}

/// Escape a key for use as a pointer token.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Parse an array index token. `-` is not accepted here.
pub(crate) fn array_index(token: &str) -> Option<usize> {
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}
