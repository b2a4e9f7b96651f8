//! FFI layer for embedding the engine in other runtimes.
//!
//! This module provides C-compatible functions around an engine editing a
//! [`JsonDocument`] with the standard operation [`Registry`]. All data
//! crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `coedit_*` functions are allocated by Rust
//! - Caller must free them with `coedit_string_free`
//! - Engine pointers must be freed with `coedit_engine_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::error::Result;
use crate::{JsonDocument, PortableVersioned, ReconciliationEngine, Registry, VersionId};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// An engine plus the registry used to decode incoming operations.
pub struct FfiEngine {
    engine: ReconciliationEngine<JsonDocument>,
    registry: Registry<JsonDocument>,
}

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

impl<T: serde::Serialize> From<Result<T>> for FfiResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => FfiResult::ok(value),
            Err(e) => FfiResult::err(e.to_string()),
        }
    }
}

/// Snapshot of the engine's history for display or debugging.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryView {
    finalized: Vec<PortableVersioned>,
    pending: Vec<PortableVersioned>,
    pending_undo_requests: Vec<VersionId>,
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `coedit_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained null bytes - return error JSON
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

fn respond<T: serde::Serialize>(result: FfiResult<T>) -> *mut c_char {
    to_c_string(result.to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse a versioned operation and decode it through the engine's registry.
fn parse_versioned(
    engine: &FfiEngine,
    json: &str,
) -> Result<crate::VersionedOperation<JsonDocument>> {
    let portable: PortableVersioned = serde_json::from_str(json)?;
    engine.registry.decode_versioned(&portable)
}

// ============================================================================
// Engine Lifecycle
// ============================================================================

/// Create a new engine.
///
/// # Arguments
/// - `document_json`: JSON string of the starting document
///
/// # Returns
/// Pointer to the engine, or null on failure.
///
/// # Safety
/// - `document_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `coedit_engine_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_new(document_json: *const c_char) -> *mut FfiEngine {
    let document_str = match from_c_string(document_json) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    let document = match JsonDocument::from_json(&document_str) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("rejected starting document: {}", e);
            return ptr::null_mut();
        }
    };

    let engine = FfiEngine {
        engine: ReconciliationEngine::new(document),
        registry: Registry::standard(),
    };
    Box::into_raw(Box::new(engine))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_free(engine: *mut FfiEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `coedit_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn coedit_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the engine version string.
///
/// The returned pointer is static and must not be freed.
#[no_mangle]
pub extern "C" fn coedit_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ============================================================================
// Submission
// ============================================================================

/// Apply a local operation optimistically.
///
/// # Arguments
/// - `vop_json`: JSON `PortableVersioned`; `versionId` is the placeholder id
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - `vop_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_submit_pending(
    engine: *mut FfiEngine,
    vop_json: *const c_char,
) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    let vop_str = match from_c_string(vop_json) {
        Some(s) => s,
        None => return respond(FfiResult::<()>::err("invalid operation JSON")),
    };

    let result = parse_versioned(engine, &vop_str).and_then(|vop| engine.engine.submit_pending(vop));
    respond(FfiResult::from(result))
}

/// Place an operation with an authoritative version.
///
/// # Arguments
/// - `vop_json`: JSON `PortableVersioned`
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - `vop_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_submit(
    engine: *mut FfiEngine,
    vop_json: *const c_char,
) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    let vop_str = match from_c_string(vop_json) {
        Some(s) => s,
        None => return respond(FfiResult::<()>::err("invalid operation JSON")),
    };

    let result = parse_versioned(engine, &vop_str).and_then(|vop| engine.engine.submit(vop));
    respond(FfiResult::from(result))
}

/// Finalize a pending local operation.
///
/// # Returns
/// JSON string: `{"ok": true}`, `{"ok": false}` when the pending id is
/// unknown, or `{"error": "message"}`
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_finalize_local(
    engine: *mut FfiEngine,
    pending_id: u64,
    version: u64,
) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    respond(FfiResult::from(
        engine.engine.finalize_local(pending_id, version),
    ))
}

// ============================================================================
// Undo / Redo
// ============================================================================

/// Undo a finalized version.
///
/// # Returns
/// JSON string: `{"ok": bool}` (false when the version has not arrived)
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_undo(engine: *mut FfiEngine, version: u64) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    respond(FfiResult::ok(engine.engine.undo(version)))
}

/// Redo a finalized version.
///
/// # Returns
/// JSON string: `{"ok": bool}` (false when the version has not arrived)
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_redo(engine: *mut FfiEngine, version: u64) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    respond(FfiResult::ok(engine.engine.redo(version)))
}

/// Undo the most recent live local operation.
///
/// # Returns
/// JSON string: `{"ok": {"pending": id}}`, `{"ok": {"finalized": version}}`
/// or `{"ok": null}` when there is nothing to undo
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_undo_last_local(engine: *mut FfiEngine) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    respond(FfiResult::ok(engine.engine.undo_last_local()))
}

/// Redo the most recently undone local operation.
///
/// # Returns
/// Same shape as `coedit_engine_undo_last_local`.
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_redo_last_local(engine: *mut FfiEngine) -> *mut c_char {
    let engine = match engine.as_mut() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    respond(FfiResult::ok(engine.engine.redo_last_local()))
}

// ============================================================================
// Inspection
// ============================================================================

/// Get the live document.
///
/// # Returns
/// JSON string: `{"ok": <document>}` or `{"error": "message"}`
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_document(engine: *const FfiEngine) -> *mut c_char {
    let engine = match engine.as_ref() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    respond(FfiResult::ok(engine.engine.document()))
}

/// Whether any local operation awaits finalization.
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_has_pending(engine: *const FfiEngine) -> bool {
    match engine.as_ref() {
        Some(e) => e.engine.has_pending(),
        None => false,
    }
}

/// Get the finalized and pending history in wire form.
///
/// # Returns
/// JSON string: `{"ok": {"finalized": [...], "pending": [...],
/// "pendingUndoRequests": [...]}}` or `{"error": "message"}`
///
/// # Safety
/// - `engine` must be a valid pointer from `coedit_engine_new` or null
/// - Caller must free the returned string with `coedit_string_free`
#[no_mangle]
pub unsafe extern "C" fn coedit_engine_history(engine: *const FfiEngine) -> *mut c_char {
    let engine = match engine.as_ref() {
        Some(e) => e,
        None => return respond(FfiResult::<()>::err("null engine pointer")),
    };

    let encode = |ops: &[crate::VersionedOperation<JsonDocument>]| {
        ops.iter()
            .map(|vop| vop.to_portable())
            .collect::<Result<Vec<_>>>()
    };

    let view = encode(engine.engine.finalized()).and_then(|finalized| {
        Ok(HistoryView {
            finalized,
            pending: encode(engine.engine.pending())?,
            pending_undo_requests: engine.engine.pending_undo_requests().to_vec(),
        })
    });
    respond(FfiResult::from(view))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(ptr: *mut c_char) -> serde_json::Value {
        unsafe {
            let json = CStr::from_ptr(ptr).to_str().unwrap().to_string();
            coedit_string_free(ptr);
            serde_json::from_str(&json).unwrap()
        }
    }

    fn new_engine() -> *mut FfiEngine {
        let doc = CString::new(r#"{"info": {}}"#).unwrap();
        unsafe { coedit_engine_new(doc.as_ptr()) }
    }

    fn vop(version: u64, path: &str, value: &str) -> CString {
        CString::new(
            serde_json::json!({
                "versionId": version,
                "author": "alice",
                "operation": {"type": "changeValue", "path": path, "value": value}
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn ffi_engine_lifecycle() {
        unsafe {
            let engine = new_engine();
            assert!(!engine.is_null());
            assert!(!coedit_engine_has_pending(engine));
            coedit_engine_free(engine);

            // free(null) is a no-op
            coedit_engine_free(ptr::null_mut());
        }
    }

    #[test]
    fn ffi_engine_new_rejects_bad_input() {
        unsafe {
            assert!(coedit_engine_new(ptr::null()).is_null());

            let bad = CString::new("{not json").unwrap();
            assert!(coedit_engine_new(bad.as_ptr()).is_null());
        }
    }

    #[test]
    fn ffi_submit_out_of_order() {
        unsafe {
            let engine = new_engine();

            let late = vop(2, "/info/version", "1.0");
            let early = vop(1, "/info/title", "Pets");
            assert_eq!(
                call(coedit_engine_submit(engine, late.as_ptr())),
                serde_json::json!({"ok": null})
            );
            call(coedit_engine_submit(engine, early.as_ptr()));

            let doc = call(coedit_engine_document(engine));
            assert_eq!(
                doc["ok"],
                serde_json::json!({"info": {"title": "Pets", "version": "1.0"}})
            );

            let history = call(coedit_engine_history(engine));
            assert_eq!(history["ok"]["finalized"][0]["versionId"], 1);
            assert_eq!(history["ok"]["finalized"][1]["versionId"], 2);

            coedit_engine_free(engine);
        }
    }

    #[test]
    fn ffi_pending_finalize_and_undo() {
        unsafe {
            let engine = new_engine();

            let edit = vop(500, "/info/title", "Mine");
            call(coedit_engine_submit_pending(engine, edit.as_ptr()));
            assert!(coedit_engine_has_pending(engine));

            let finalized = call(coedit_engine_finalize_local(engine, 500, 1));
            assert_eq!(finalized["ok"], true);
            assert!(!coedit_engine_has_pending(engine));

            let unknown = call(coedit_engine_finalize_local(engine, 500, 2));
            assert_eq!(unknown["ok"], false);

            let undone = call(coedit_engine_undo_last_local(engine));
            assert_eq!(undone["ok"], serde_json::json!({"finalized": 1}));
            let doc = call(coedit_engine_document(engine));
            assert_eq!(doc["ok"], serde_json::json!({"info": {}}));

            let redone = call(coedit_engine_redo_last_local(engine));
            assert_eq!(redone["ok"], serde_json::json!({"finalized": 1}));

            assert_eq!(call(coedit_engine_undo(engine, 1))["ok"], true);
            assert_eq!(call(coedit_engine_redo(engine, 1))["ok"], true);
            assert_eq!(call(coedit_engine_undo(engine, 42))["ok"], false);

            let history = call(coedit_engine_history(engine));
            assert_eq!(history["ok"]["pendingUndoRequests"], serde_json::json!([42]));

            coedit_engine_free(engine);
        }
    }

    #[test]
    fn ffi_version() {
        unsafe {
            let version = CStr::from_ptr(coedit_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }

    #[test]
    fn ffi_error_handling() {
        unsafe {
            // Null engine pointer
            let op = vop(1, "/info/title", "x");
            let result = call(coedit_engine_submit(ptr::null_mut(), op.as_ptr()));
            assert!(result.get("error").is_some());

            let engine = new_engine();

            // Invalid JSON
            let invalid = CString::new("not valid json").unwrap();
            let result = call(coedit_engine_submit(engine, invalid.as_ptr()));
            assert!(result.get("error").is_some());

            // Unknown operation type
            let unknown = CString::new(
                r#"{"versionId": 1, "author": "a", "operation": {"type": "warp"}}"#,
            )
            .unwrap();
            let result = call(coedit_engine_submit(engine, unknown.as_ptr()));
            assert_eq!(result["error"], "unknown operation type: warp");

            // Duplicate version
            call(coedit_engine_submit(engine, op.as_ptr()));
            let result = call(coedit_engine_submit(engine, op.as_ptr()));
            assert_eq!(result["error"], "version already finalized: 1");

            coedit_engine_free(engine);
        }
    }
}
