//! Reconciliation of pending and finalized operations.
//!
//! This is the core of determinism. Operations arrive in any order, some
//! applied optimistically before the authority has ordered them, and the
//! engine keeps the live document equal to a clean in-order replay.
//!
//! # Algorithm
//!
//! Operations are not assumed to commute, so a late arrival is placed by
//! brute force:
//!
//! 1. Rewind every pending operation, newest first
//! 2. Rewind finalized operations with a higher version than the newcomer
//! 3. Insert the newcomer in version order
//! 4. Replay the finalized tail from the insertion point
//! 5. Replay the pending operations in arrival order
//!
//! Undo and redo of an arbitrary version use the same rewind/replay around
//! the target, flipping its reverted flag in between.
//!
//! # Invariants
//!
//! After every public method returns:
//! - `finalized` is strictly ascending by version
//! - the document equals the start state with every non-reverted finalized
//!   operation applied in version order, then every non-reverted pending
//!   operation in arrival order
//! - every pending operation is local

use crate::error::{Error, Result};
use crate::versioned::VersionedOperation;
use crate::VersionId;
use serde::{Deserialize, Serialize};

/// Identifies the history entry an undo/redo-last-local call touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryRef {
    /// A pending entry, by placeholder id
    Pending(VersionId),
    /// A finalized entry, by version
    Finalized(VersionId),
}

/// Owns a document and the ordered history of operations applied to it.
///
/// Callers serialize access: one engine per document session, fed by a
/// single receive loop.
pub struct ReconciliationEngine<D> {
    document: D,
    finalized: Vec<VersionedOperation<D>>,
    pending: Vec<VersionedOperation<D>>,
    pending_undo_requests: Vec<VersionId>,
}

impl<D> ReconciliationEngine<D> {
    /// Create an engine around a starting document.
    pub fn new(document: D) -> Self {
        Self {
            document,
            finalized: Vec::new(),
            pending: Vec::new(),
            pending_undo_requests: Vec::new(),
        }
    }

    /// The live document.
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Consume the engine, keeping the document.
    pub fn into_document(self) -> D {
        self.document
    }

    /// Whether any local operation is still waiting for a version.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Finalized operations in version order.
    pub fn finalized(&self) -> &[VersionedOperation<D>] {
        &self.finalized
    }

    /// Pending operations in arrival order.
    pub fn pending(&self) -> &[VersionedOperation<D>] {
        &self.pending
    }

    /// Versions whose undo was requested before they arrived.
    pub fn pending_undo_requests(&self) -> &[VersionId] {
        &self.pending_undo_requests
    }

    /// Highest finalized version, if any.
    pub fn latest_version(&self) -> Option<VersionId> {
        self.finalized.last().map(|e| e.version())
    }

    /// Apply a local operation optimistically, ahead of authoritative ordering.
    ///
    /// The operation is marked local and executed immediately. Its version
    /// field is treated as a placeholder id until
    /// [`finalize_local`](Self::finalize_local) assigns the real one.
    pub fn submit_pending(&mut self, mut vop: VersionedOperation<D>) -> Result<()> {
        let placeholder = vop.version();
        if self.pending.iter().any(|p| p.version() == placeholder) {
            return Err(Error::DuplicatePending(placeholder));
        }

        vop.set_local(true);
        vop.execute(&mut self.document);
        self.pending.push(vop);

        tracing::trace!(placeholder, pending = self.pending.len(), "pending operation applied");
        Ok(())
    }

    /// Place an operation with an authoritative version into the history.
    ///
    /// Works for any arrival order: everything that should come after the
    /// newcomer is rewound, the newcomer inserted, and the tail replayed.
    pub fn submit(&mut self, vop: VersionedOperation<D>) -> Result<()> {
        let version = vop.version();
        if self.position_of(version).is_some() {
            return Err(Error::DuplicateVersion(version));
        }

        self.rewind_pending();
        self.insert_finalized(vop);
        self.replay_pending();
        Ok(())
    }

    /// Promote a pending local operation once the authority assigns it a version.
    ///
    /// Returns `Ok(false)` without touching anything if no pending operation
    /// carries `pending_id`.
    pub fn finalize_local(&mut self, pending_id: VersionId, version: VersionId) -> Result<bool> {
        if self.position_of(version).is_some() {
            return Err(Error::DuplicateVersion(version));
        }

        let Some(index) = self.pending.iter().position(|p| p.version() == pending_id) else {
            tracing::warn!(pending_id, version, "no pending operation to finalize");
            return Ok(false);
        };

        let newest = self.latest_version().map_or(true, |latest| version > latest);
        if index == 0 && newest {
            // Already in its final position: oldest pending, newest finalized.
            self.note_queued_undo(version);
            let mut vop = self.pending.remove(0);
            vop.set_version(version);
            self.finalized.push(vop);
            tracing::debug!(pending_id, version, "finalized in place");
            return Ok(true);
        }

        self.rewind_pending();
        let mut detached = std::mem::take(&mut self.pending);
        let mut vop = detached.remove(index);
        vop.set_version(version);
        self.insert_finalized(vop);
        self.pending = detached;
        self.replay_pending();

        tracing::debug!(
            pending_id,
            version,
            remaining = self.pending.len(),
            "finalized out of order"
        );
        Ok(true)
    }

    /// Revert a finalized operation, re-deriving everything applied after it.
    ///
    /// If the version has not arrived yet the request is queued (see
    /// [`pending_undo_requests`](Self::pending_undo_requests)) and `false`
    /// is returned. Undoing or redoing a present version clears its request.
    pub fn undo(&mut self, version: VersionId) -> bool {
        self.set_reverted(version, true)
    }

    /// Re-apply a reverted finalized operation.
    ///
    /// If the version has not arrived yet, any queued undo request for it is
    /// dropped and `false` is returned.
    pub fn redo(&mut self, version: VersionId) -> bool {
        self.set_reverted(version, false)
    }

    /// Undo the most recent live local operation, pending or finalized.
    pub fn undo_last_local(&mut self) -> Option<EntryRef> {
        if let Some(vop) = self
            .pending
            .iter_mut()
            .rev()
            .find(|p| p.is_local() && !p.is_reverted())
        {
            // Nothing live is applied after it, so no rewind is needed.
            vop.undo(&mut self.document);
            return Some(EntryRef::Pending(vop.version()));
        }

        let version = self
            .finalized
            .iter()
            .rev()
            .find(|e| e.is_local() && !e.is_reverted())
            .map(|e| e.version())?;
        self.undo(version);
        Some(EntryRef::Finalized(version))
    }

    /// Redo the most recently undone local operation.
    ///
    /// Pending entries are searched first, newest to oldest. Otherwise the
    /// newest local finalized entry is redone if it is reverted; a live local
    /// entry there ends the search, so redo never reaches past an edit made
    /// after the undo.
    pub fn redo_last_local(&mut self) -> Option<EntryRef> {
        if let Some(index) = self
            .pending
            .iter()
            .rposition(|p| p.is_local() && p.is_reverted())
        {
            let placeholder = self.pending[index].version();
            if self.pending[index + 1..].iter().all(|p| p.is_reverted()) {
                // Nothing live is applied after it, so it lands on top.
                self.pending[index].redo(&mut self.document);
            } else {
                for vop in self.pending[index..].iter_mut().rev() {
                    vop.rewind(&mut self.document);
                }
                self.pending[index].set_reverted(false);
                for vop in self.pending[index..].iter_mut() {
                    vop.execute(&mut self.document);
                }
                tracing::debug!(placeholder, "pending tail re-derived for redo");
            }
            return Some(EntryRef::Pending(placeholder));
        }

        let version = self
            .finalized
            .iter()
            .rev()
            .find(|e| e.is_local())
            .filter(|e| e.is_reverted())
            .map(|e| e.version())?;
        self.redo(version);
        Some(EntryRef::Finalized(version))
    }

    /// Check the structural invariants of the history.
    ///
    /// Verifies version ordering and uniqueness in `finalized`, and locality
    /// and placeholder uniqueness in `pending`.
    pub fn check_invariants(&self) -> Result<()> {
        for pair in self.finalized.windows(2) {
            if pair[0].version() >= pair[1].version() {
                return Err(Error::InvariantViolation(format!(
                    "finalized versions not strictly ascending: {} then {}",
                    pair[0].version(),
                    pair[1].version()
                )));
            }
        }

        for (index, vop) in self.pending.iter().enumerate() {
            if !vop.is_local() {
                return Err(Error::InvariantViolation(format!(
                    "pending operation {} is not local",
                    vop.version()
                )));
            }
            if self.pending[..index]
                .iter()
                .any(|p| p.version() == vop.version())
            {
                return Err(Error::InvariantViolation(format!(
                    "pending id {} used twice",
                    vop.version()
                )));
            }
        }

        Ok(())
    }

    fn position_of(&self, version: VersionId) -> Option<usize> {
        self.finalized
            .binary_search_by_key(&version, |e| e.version())
            .ok()
    }

    fn set_reverted(&mut self, version: VersionId, reverted: bool) -> bool {
        let Some(index) = self.position_of(version) else {
            if reverted {
                if !self.pending_undo_requests.contains(&version) {
                    self.pending_undo_requests.push(version);
                }
                tracing::warn!(version, "undo of unknown version queued");
            } else {
                self.pending_undo_requests.retain(|v| *v != version);
                tracing::warn!(version, "redo of unknown version ignored");
            }
            return false;
        };
        self.pending_undo_requests.retain(|v| *v != version);

        if self.finalized[index].is_reverted() == reverted {
            // Rewinding and replaying would leave everything as it is.
            return true;
        }

        self.rewind_pending();
        for vop in self.finalized[index..].iter_mut().rev() {
            vop.rewind(&mut self.document);
        }
        self.finalized[index].set_reverted(reverted);
        for vop in self.finalized[index..].iter_mut() {
            vop.execute(&mut self.document);
        }
        self.replay_pending();

        tracing::debug!(
            version,
            reverted,
            replayed = self.finalized.len() - index + self.pending.len(),
            "history re-derived"
        );
        true
    }

    /// Insert by version, rewinding and replaying the later tail.
    fn insert_finalized(&mut self, vop: VersionedOperation<D>) {
        let version = vop.version();
        self.note_queued_undo(version);
        let mut index = self.finalized.len();
        while index > 0 && self.finalized[index - 1].version() > version {
            index -= 1;
            self.finalized[index].rewind(&mut self.document);
        }

        self.finalized.insert(index, vop);
        for vop in self.finalized[index..].iter_mut() {
            vop.execute(&mut self.document);
        }

        tracing::debug!(
            version,
            position = index,
            replayed = self.finalized.len() - index,
            "finalized operation inserted"
        );
    }

    fn note_queued_undo(&self, version: VersionId) {
        if self.pending_undo_requests.contains(&version) {
            // Reverting on arrival needs product rules we don't have yet;
            // keep the request so the caller can act on it.
            tracing::warn!(version, "operation arrived with a queued undo request");
        }
    }

    fn rewind_pending(&mut self) {
        for vop in self.pending.iter_mut().rev() {
            vop.rewind(&mut self.document);
        }
    }

    fn replay_pending(&mut self) {
        for vop in self.pending.iter_mut() {
            vop.execute(&mut self.document);
        }
    }
}

impl<D: Default> Default for ReconciliationEngine<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: std::fmt::Debug> std::fmt::Debug for ReconciliationEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("document", &self.document)
            .field("finalized", &self.finalized)
            .field("pending", &self.pending)
            .field("pending_undo_requests", &self.pending_undo_requests)
            .finish()
    }
}
