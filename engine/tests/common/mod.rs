//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use coedit_engine::{JsonDocument, Operation, ReconciliationEngine, Registry, VersionedOperation};

pub type Engine = ReconciliationEngine<JsonDocument>;

/// Install a test-friendly tracing subscriber (honours `RUST_LOG`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn remote(
    version: u64,
    op: impl Operation<JsonDocument> + 'static,
) -> VersionedOperation<JsonDocument> {
    VersionedOperation::remote(Box::new(op), version, "remote")
}

pub fn local(
    version: u64,
    op: impl Operation<JsonDocument> + 'static,
) -> VersionedOperation<JsonDocument> {
    VersionedOperation::new(Box::new(op), version, "me", true)
}

pub fn pending(
    placeholder: u64,
    op: impl Operation<JsonDocument> + 'static,
) -> VersionedOperation<JsonDocument> {
    VersionedOperation::pending(Box::new(op), placeholder, "me")
}

/// Rebuild the document from scratch: fresh copies of every live finalized
/// operation in version order, then every live pending one in arrival order.
pub fn replayed(start: &JsonDocument, engine: &Engine) -> JsonDocument {
    let registry = Registry::standard();
    let mut doc = start.clone();
    for vop in engine.finalized().iter().chain(engine.pending()) {
        if vop.is_reverted() {
            continue;
        }
        let portable = vop.operation().to_portable().unwrap();
        let mut op = registry.decode(&portable).unwrap();
        op.execute(&mut doc);
    }
    doc
}

/// Structural invariants hold and the live document matches a clean replay.
pub fn assert_consistent(start: &JsonDocument, engine: &Engine) {
    engine.check_invariants().unwrap();
    assert_eq!(engine.document(), &replayed(start, engine));
}
