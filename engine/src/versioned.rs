//! Operations wrapped with collaboration metadata.
//!
//! A [`VersionedOperation`] carries its authoritative position in the shared
//! history, its author, whether it was produced locally, and whether it is
//! currently reverted. Its execute/undo/redo methods are guarded so the
//! engine can call them redundantly while rewinding and replaying.

use crate::error::Result;
use crate::operation::{BoxedOperation, Operation, PortableOp};
use crate::{Author, VersionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An operation plus its ordering, ownership and revert state.
///
/// While the operation is pending, `version` holds the caller's placeholder
/// id; finalization replaces it with the authoritative version.
pub struct VersionedOperation<D> {
    operation: BoxedOperation<D>,
    version: VersionId,
    author: Author,
    local: bool,
    reverted: bool,
}

impl<D> VersionedOperation<D> {
    /// Wrap an operation.
    pub fn new(
        operation: BoxedOperation<D>,
        version: VersionId,
        author: impl Into<Author>,
        local: bool,
    ) -> Self {
        Self {
            operation,
            version,
            author: author.into(),
            local,
            reverted: false,
        }
    }

    /// Wrap an operation received from a collaborator.
    pub fn remote(operation: BoxedOperation<D>, version: VersionId, author: impl Into<Author>) -> Self {
        Self::new(operation, version, author, false)
    }

    /// Wrap a local operation awaiting an authoritative version.
    pub fn pending(
        operation: BoxedOperation<D>,
        placeholder: VersionId,
        author: impl Into<Author>,
    ) -> Self {
        Self::new(operation, placeholder, author, true)
    }

    /// Version id, or the placeholder id while pending.
    pub fn version(&self) -> VersionId {
        self.version
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn is_reverted(&self) -> bool {
        self.reverted
    }

    /// The wrapped operation.
    pub fn operation(&self) -> &dyn Operation<D> {
        self.operation.as_ref()
    }

    pub(crate) fn set_version(&mut self, version: VersionId) {
        self.version = version;
    }

    pub(crate) fn set_local(&mut self, local: bool) {
        self.local = local;
    }

    pub(crate) fn set_reverted(&mut self, reverted: bool) {
        self.reverted = reverted;
    }

    /// Apply the operation unless it is reverted.
    pub fn execute(&mut self, doc: &mut D) {
        if !self.reverted {
            self.operation.execute(doc);
        }
    }

    /// Revert the operation. No-op if already reverted.
    pub fn undo(&mut self, doc: &mut D) {
        if !self.reverted {
            self.operation.undo(doc);
            self.reverted = true;
        }
    }

    /// Re-apply a reverted operation. No-op if not reverted.
    pub fn redo(&mut self, doc: &mut D) {
        if self.reverted {
            self.operation.execute(doc);
            self.reverted = false;
        }
    }

    /// Take the operation out of the document without marking it reverted.
    ///
    /// Used while rewinding history: the entry is replayed with
    /// [`execute`](Self::execute) afterwards. Reverted entries are not in the
    /// document, so there is nothing to take out.
    pub fn rewind(&mut self, doc: &mut D) {
        if !self.reverted {
            self.operation.undo(doc);
        }
    }

    /// Encode in the portable wire form.
    pub fn to_portable(&self) -> Result<PortableVersioned> {
        Ok(PortableVersioned {
            version_id: self.version,
            author: self.author.clone(),
            local: self.local,
            reverted: self.reverted,
            operation: self.operation.to_portable()?,
        })
    }
}

impl<D> fmt::Debug for VersionedOperation<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedOperation")
            .field("operation", &self.operation)
            .field("version", &self.version)
            .field("author", &self.author)
            .field("local", &self.local)
            .field("reverted", &self.reverted)
            .finish()
    }
}

/// Wire form of a [`VersionedOperation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableVersioned {
    /// Authoritative version, or placeholder id while pending
    pub version_id: VersionId,
    /// Opaque author identity
    pub author: Author,
    /// Produced by this process
    #[serde(default)]
    pub local: bool,
    /// Currently undone
    #[serde(default)]
    pub reverted: bool,
    /// The operation itself
    pub operation: PortableOp,
}
