//! Aggregate operations.
//!
//! A [`Batch`] groups several operations into one history entry, so a
//! compound edit is versioned, undone and redone as a unit.

use crate::error::Result;
use crate::operation::{BoxedOperation, Operation, PortableOp};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations applied in order and undone in reverse.
pub struct Batch<D> {
    label: Option<String>,
    operations: Vec<BoxedOperation<D>>,
}

impl<D> Batch<D> {
    pub const KIND: &'static str = "batch";

    pub fn new(operations: Vec<BoxedOperation<D>>) -> Self {
        Self {
            label: None,
            operations,
        }
    }

    /// A batch with a human-readable label, e.g. "Rename path".
    pub fn labeled(label: impl Into<String>, operations: Vec<BoxedOperation<D>>) -> Self {
        Self {
            label: Some(label.into()),
            operations,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl<D> Operation<D> for Batch<D> {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, doc: &mut D) {
        for op in self.operations.iter_mut() {
            op.execute(doc);
        }
    }

    fn undo(&mut self, doc: &mut D) {
        for op in self.operations.iter_mut().rev() {
            op.undo(doc);
        }
    }

    fn to_portable(&self) -> Result<PortableOp> {
        let operations = self
            .operations
            .iter()
            .map(|op| op.to_portable())
            .collect::<Result<Vec<_>>>()?;
        PortableOp::encode(
            Self::KIND,
            &BatchBody {
                label: self.label.clone(),
                operations,
            },
        )
    }
}

impl<D> fmt::Debug for Batch<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("label", &self.label)
            .field("operations", &self.operations)
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct BatchBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    operations: Vec<PortableOp>,
}

/// Registry factory for [`Batch`]; children are decoded through the same registry.
pub fn decode_batch<D: 'static>(
    registry: &Registry<D>,
    portable: &PortableOp,
) -> Result<BoxedOperation<D>> {
    let body: BatchBody = portable.decode()?;
    let operations = body
        .operations
        .iter()
        .map(|op| registry.decode(op))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(Batch {
        label: body.label,
        operations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::JsonDocument;
    use crate::error::Error;
    use crate::ops::{ChangeValue, InsertItem, RemoveValue};
    use serde_json::json;

    fn info_batch() -> Batch<JsonDocument> {
        Batch::labeled(
            "Describe API",
            vec![
                Box::new(ChangeValue::title("Pets")),
                Box::new(ChangeValue::version("2.0")),
                Box::new(InsertItem::new("/tags", 0, "pets")),
            ],
        )
    }

    #[test]
    fn executes_in_order_and_undoes_in_reverse() {
        let start = JsonDocument::from_value(json!({"tags": []}));
        let mut doc = start.clone();
        let mut batch = info_batch();

        batch.execute(&mut doc);
        assert_eq!(
            doc.root(),
            &json!({"info": {"title": "Pets", "version": "2.0"}, "tags": ["pets"]})
        );

        batch.undo(&mut doc);
        assert_eq!(doc, start);
    }

    #[test]
    fn dependent_children_undo_cleanly() {
        // the second change lands inside the object the first one created
        let mut batch: Batch<JsonDocument> = Batch::new(vec![
            Box::new(ChangeValue::new("/a/b", 1)),
            Box::new(ChangeValue::new("/a/c", 2)),
            Box::new(RemoveValue::new("/a/b")),
        ]);
        let mut doc = JsonDocument::new();

        batch.execute(&mut doc);
        assert_eq!(doc.root(), &json!({"a": {"c": 2}}));

        batch.undo(&mut doc);
        assert_eq!(doc, JsonDocument::new());
    }

    #[test]
    fn accessors() {
        let batch = info_batch();
        assert_eq!(batch.label(), Some("Describe API"));
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert!(Batch::<JsonDocument>::new(vec![]).is_empty());
    }

    #[test]
    fn nested_batches_decode_recursively() {
        let inner: Batch<JsonDocument> = Batch::new(vec![Box::new(ChangeValue::title("T"))]);
        let outer: Batch<JsonDocument> = Batch::labeled(
            "outer",
            vec![Box::new(inner), Box::new(ChangeValue::version("1"))],
        );

        let portable = outer.to_portable().unwrap();
        let mut decoded = Registry::standard().decode(&portable).unwrap();
        assert_eq!(decoded.kind(), "batch");
        assert_eq!(decoded.to_portable().unwrap(), portable);

        let mut doc = JsonDocument::new();
        decoded.execute(&mut doc);
        assert_eq!(doc.root(), &json!({"info": {"title": "T", "version": "1"}}));
    }

    #[test]
    fn unknown_child_fails_the_whole_batch() {
        let portable = PortableOp::from_json(
            r#"{"type": "batch", "operations": [{"type": "warp", "to": 9}]}"#,
        )
        .unwrap();

        let err = Registry::standard().decode(&portable).unwrap_err();
        assert_eq!(err, Error::UnknownOperation("warp".into()));
    }
}
