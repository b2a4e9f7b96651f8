//! # Coedit Engine
//!
//! A reconciliation engine for real-time collaborative editing.
//!
//! Several editors change one shared document. Their edits reach each other
//! asynchronously and out of order, yet every participant must end up with
//! the same document without a central lock and without dropping anyone's
//! work. This crate keeps a single document consistent with an ordered
//! history of reversible operations, whatever order those operations arrive
//! in.
//!
//! ## Design Principles
//!
//! - **No IO**: The engine knows nothing about files, network, or platform
//! - **Deterministic**: The document is always a pure function of the history
//! - **Replay over transform**: Late arrivals are placed by rewinding and
//!   replaying, so operations only need an exact inverse, never a transform
//! - **Portable**: Runs anywhere Rust runs; an FFI layer speaks JSON
//!
//! ## Core Concepts
//!
//! ### Operations
//!
//! An [`Operation`] is a reversible edit: `execute` applies it and `undo`
//! restores the exact prior state. Operations travel between collaborators
//! as [`PortableOp`] JSON objects, rebuilt through a [`Registry`] keyed by
//! their `type` discriminator.
//!
//! ### Versioned operations
//!
//! A [`VersionedOperation`] adds the collaboration metadata: its version in
//! the shared history, author, whether it was made locally, and whether it
//! is currently reverted.
//!
//! ### Pending and finalized
//!
//! Local edits are applied immediately as *pending* and later *finalized*
//! once the coordinating authority assigns them a version. Remote edits
//! arrive already finalized. The [`ReconciliationEngine`] keeps the document
//! equal to every finalized operation applied in version order followed by
//! the pending ones in arrival order.
//!
//! ### Undo and redo
//!
//! Any finalized version can be reverted or restored; everything applied
//! after it is re-derived on top. [`ReconciliationEngine::undo_last_local`]
//! and [`ReconciliationEngine::redo_last_local`] give each editor a personal
//! undo stack that survives interleaved remote edits.
//!
//! ## Quick Start
//!
//! ```rust
//! use coedit_engine::{ChangeValue, JsonDocument, ReconciliationEngine, VersionedOperation};
//! use serde_json::json;
//!
//! let mut engine = ReconciliationEngine::new(JsonDocument::new());
//!
//! // A local edit shows up immediately
//! let edit = VersionedOperation::pending(Box::new(ChangeValue::title("Pet Store")), 1001, "me");
//! engine.submit_pending(edit).unwrap();
//!
//! // A collaborator's edit with an earlier version arrives late
//! let remote = VersionedOperation::remote(Box::new(ChangeValue::version("1.0")), 1, "alice");
//! engine.submit(remote).unwrap();
//!
//! // The authority orders our edit after it
//! engine.finalize_local(1001, 2).unwrap();
//! assert_eq!(
//!     engine.document().root(),
//!     &json!({"info": {"title": "Pet Store", "version": "1.0"}})
//! );
//!
//! // Undo our own edit without touching alice's
//! engine.undo_last_local();
//! assert_eq!(engine.document().root(), &json!({"info": {"version": "1.0"}}));
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes an engine over [`JsonDocument`] with C-compatible
//! functions. All data is exchanged as JSON strings.

pub mod batch;
pub mod document;
pub mod error;
pub mod ffi;
pub mod operation;
pub mod ops;
pub mod reconcile;
pub mod registry;
pub mod versioned;

// Re-export main types at crate root
pub use batch::Batch;
pub use document::JsonDocument;
pub use error::Error;
pub use operation::{BoxedOperation, Operation, PortableOp};
pub use ops::{ChangeValue, InsertItem, RemoveValue, RenameKey};
pub use reconcile::{EntryRef, ReconciliationEngine};
pub use registry::{decode_as, Factory, Registry};
pub use versioned::{PortableVersioned, VersionedOperation};

/// Type aliases for clarity
pub type VersionId = u64;
pub type Author = String;
