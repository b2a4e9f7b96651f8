//! Built-in operations on [`JsonDocument`].
//!
//! Every operation here captures what it overwrites when executed, so its
//! undo restores the tree exactly. They are total: when the target is
//! missing, execute does nothing and so does the matching undo.
//!
//! Captured undo state is local to the process that executed the operation
//! and is not part of the wire form.

use crate::batch::{decode_batch, Batch};
use crate::document::{array_index, escape_token, pointer_tokens, split_pointer, JsonDocument};
use crate::error::Result;
use crate::operation::{Operation, PortableOp};
use crate::registry::{decode_as, Registry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

impl Registry<JsonDocument> {
    /// Registry with every built-in operation.
    pub fn standard() -> Self {
        Registry::new()
            .with(ChangeValue::KIND, decode_as::<ChangeValue, JsonDocument>)
            .with(RemoveValue::KIND, decode_as::<RemoveValue, JsonDocument>)
            .with(InsertItem::KIND, decode_as::<InsertItem, JsonDocument>)
            .with(RenameKey::KIND, decode_as::<RenameKey, JsonDocument>)
            .with(Batch::<JsonDocument>::KIND, decode_batch::<JsonDocument>)
    }
}

/// What a [`ChangeValue`] displaced.
#[derive(Debug, Clone, PartialEq)]
enum Prior {
    /// An existing value was overwritten
    Replaced(Value),
    /// A key was created; holds the pointer of the topmost new key
    Created(String),
}

/// Set the value at a path, creating missing parent objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeValue {
    pub path: String,
    pub value: Value,
    #[serde(skip)]
    prior: Option<Prior>,
}

impl ChangeValue {
    pub const KIND: &'static str = "changeValue";

    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            prior: None,
        }
    }

    /// Change `/info/title`.
    pub fn title(title: impl Into<String>) -> Self {
        Self::new("/info/title", title.into())
    }

    /// Change `/info/version`.
    pub fn version(version: impl Into<String>) -> Self {
        Self::new("/info/version", version.into())
    }

    /// Change `/info/description`.
    pub fn description(description: impl Into<String>) -> Self {
        Self::new("/info/description", description.into())
    }
}

impl Operation<JsonDocument> for ChangeValue {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, doc: &mut JsonDocument) {
        self.prior = set_creating(doc.root_mut(), &self.path, self.value.clone());
    }

    fn undo(&mut self, doc: &mut JsonDocument) {
        match self.prior.take() {
            Some(Prior::Replaced(old)) => {
                if let Some(slot) = doc.get_mut(&self.path) {
                    *slot = old;
                }
            }
            Some(Prior::Created(pointer)) => {
                remove_at(doc.root_mut(), &pointer);
            }
            None => {}
        }
    }

    fn to_portable(&self) -> Result<PortableOp> {
        PortableOp::encode(Self::KIND, self)
    }
}

/// Remove an object key or an array element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveValue {
    pub path: String,
    #[serde(skip)]
    removed: Option<Value>,
}

impl RemoveValue {
    pub const KIND: &'static str = "removeValue";

    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            removed: None,
        }
    }
}

impl Operation<JsonDocument> for RemoveValue {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, doc: &mut JsonDocument) {
        self.removed = remove_at(doc.root_mut(), &self.path);
    }

    fn undo(&mut self, doc: &mut JsonDocument) {
        if let Some(value) = self.removed.take() {
            restore_at(doc.root_mut(), &self.path, value);
        }
    }

    fn to_portable(&self) -> Result<PortableOp> {
        PortableOp::encode(Self::KIND, self)
    }
}

/// Insert a value into an array. The index is clamped to the array length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertItem {
    /// Pointer to the array
    pub path: String,
    pub index: usize,
    pub value: Value,
    #[serde(skip)]
    inserted_at: Option<usize>,
}

impl InsertItem {
    pub const KIND: &'static str = "insertItem";

    pub fn new(path: impl Into<String>, index: usize, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            index,
            value: value.into(),
            inserted_at: None,
        }
    }
}

impl Operation<JsonDocument> for InsertItem {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, doc: &mut JsonDocument) {
        self.inserted_at = match doc.get_mut(&self.path) {
            Some(Value::Array(items)) => {
                let at = self.index.min(items.len());
                items.insert(at, self.value.clone());
                Some(at)
            }
            _ => None,
        };
    }

    fn undo(&mut self, doc: &mut JsonDocument) {
        let Some(at) = self.inserted_at.take() else {
            return;
        };
        if let Some(Value::Array(items)) = doc.get_mut(&self.path) {
            if at < items.len() {
                items.remove(at);
            }
        }
    }

    fn to_portable(&self) -> Result<PortableOp> {
        PortableOp::encode(Self::KIND, self)
    }
}

/// Rename a key of an object, keeping its value.
///
/// Does nothing if `from` is absent or `to` is already taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameKey {
    /// Pointer to the object
    pub path: String,
    pub from: String,
    pub to: String,
    #[serde(skip)]
    renamed: bool,
}

impl RenameKey {
    pub const KIND: &'static str = "renameKey";

    pub fn new(path: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: from.into(),
            to: to.into(),
            renamed: false,
        }
    }
}

impl Operation<JsonDocument> for RenameKey {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, doc: &mut JsonDocument) {
        self.renamed = false;
        if self.from == self.to {
            return;
        }
        if let Some(Value::Object(map)) = doc.get_mut(&self.path) {
            if map.contains_key(&self.to) {
                return;
            }
            if let Some(value) = map.remove(&self.from) {
                map.insert(self.to.clone(), value);
                self.renamed = true;
            }
        }
    }

    fn undo(&mut self, doc: &mut JsonDocument) {
        if !std::mem::take(&mut self.renamed) {
            return;
        }
        if let Some(Value::Object(map)) = doc.get_mut(&self.path) {
            if let Some(value) = map.remove(&self.to) {
                map.insert(self.from.clone(), value);
            }
        }
    }

    fn to_portable(&self) -> Result<PortableOp> {
        PortableOp::encode(Self::KIND, self)
    }
}

/// Set `path` to `value`, creating missing parent objects on the way.
///
/// Returns `None` when the path runs through a scalar or a missing array
/// element, in which case nothing was changed.
fn set_creating(root: &mut Value, path: &str, value: Value) -> Option<Prior> {
    let tokens = pointer_tokens(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Some(Prior::Replaced(std::mem::replace(root, value)));
    };

    let mut walked = String::new();
    let mut created = None;
    let mut cur = root;
    for token in parents {
        walked.push('/');
        walked.push_str(&escape_token(token));
        cur = match cur {
            Value::Object(map) => {
                if created.is_none() && !map.contains_key(token) {
                    created = Some(walked.clone());
                }
                map.entry(token.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
            }
            // Objects created above are empty, so this arm never runs after
            // a creation and the early return cannot leave debris behind.
            Value::Array(items) => items.get_mut(array_index(token)?)?,
            _ => return None,
        };
    }

    match cur {
        Value::Object(map) => {
            let old = map.insert(last.clone(), value);
            match (created, old) {
                (Some(pointer), _) => Some(Prior::Created(pointer)),
                (None, Some(old)) => Some(Prior::Replaced(old)),
                (None, None) => {
                    walked.push('/');
                    walked.push_str(&escape_token(last));
                    Some(Prior::Created(walked))
                }
            }
        }
        Value::Array(items) => {
            let slot = items.get_mut(array_index(last)?)?;
            Some(Prior::Replaced(std::mem::replace(slot, value)))
        }
        _ => None,
    }
}

fn remove_at(root: &mut Value, path: &str) -> Option<Value> {
    let (parent, token) = split_pointer(path)?;
    match root.pointer_mut(parent)? {
        Value::Object(map) => map.remove(&token),
        Value::Array(items) => {
            let idx = array_index(&token)?;
            (idx < items.len()).then(|| items.remove(idx))
        }
        _ => None,
    }
}

fn restore_at(root: &mut Value, path: &str, value: Value) {
    let Some((parent, token)) = split_pointer(path) else {
        return;
    };
    match root.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.insert(token, value);
        }
        Some(Value::Array(items)) => {
            if let Some(idx) = array_index(&token).filter(|idx| *idx <= items.len()) {
                items.insert(idx, value);
            }
        }
        _ => {}
    }
}
