//! The reversible operation contract.
//!
//! Changes are expressed as operations, not direct mutations. Every operation
//! knows how to apply itself to a document and how to take itself back out
//! again, and that pair is all the reconciliation engine relies on.
//!
//! # Inverse law
//!
//! If `execute` takes a document from state `D` to `D'`, then `undo` applied
//! to `D'` must produce exactly `D`. Operations are not required to commute
//! with each other; the engine restores order by rewinding and replaying.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single reversible document edit.
///
/// `execute` and `undo` take `&mut self` so an operation can capture the
/// state it overwrites (an old value, a removed element) for its inverse.
/// Implementations must not keep any reference to the document beyond a call,
/// and must be total: a missing target is a no-op, never a panic.
pub trait Operation<D>: fmt::Debug {
    /// Discriminator used on the wire and by the [`Registry`](crate::Registry).
    fn kind(&self) -> &'static str;

    /// Apply the change to the document.
    fn execute(&mut self, doc: &mut D);

    /// Exact inverse of the most recent `execute`.
    fn undo(&mut self, doc: &mut D);

    /// Encode the operation in its portable wire form.
    fn to_portable(&self) -> Result<PortableOp>;
}

/// An owned, type-erased operation.
pub type BoxedOperation<D> = Box<dyn Operation<D>>;

/// Wire form of an operation: a JSON object tagged with its discriminator.
///
/// ```json
/// {"type": "changeValue", "path": "/info/title", "value": "Pet Store"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableOp {
    /// Discriminator naming the concrete operation
    #[serde(rename = "type")]
    pub kind: String,
    /// Remaining fields of the operation
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl PortableOp {
    /// Encode a serializable operation body under the given discriminator.
    pub fn encode<T: Serialize>(kind: &str, body: &T) -> Result<Self> {
        match serde_json::to_value(body)? {
            serde_json::Value::Object(body) => Ok(Self {
                kind: kind.to_string(),
                body,
            }),
            other => Err(Error::InvalidPortable(format!(
                "body of '{}' must be a JSON object, got {}",
                kind, other
            ))),
        }
    }

    /// Decode the body into a concrete operation type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.body.clone())).map_err(|e| {
            Error::InvalidPortable(format!("malformed '{}' operation: {}", self.kind, e))
        })
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
