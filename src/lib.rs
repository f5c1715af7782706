//! # Internal Storage Core
//!
//! Storage for framework datasets, data points and uploaded documents, with
//! document reference tracking. Deleting a document first removes every
//! reference to it from stored datasets and data points, and only then drops
//! the document itself, so no record is left pointing at a missing file.
//!
//! ## Building blocks
//!
//! - [`storage_state::AppStorageState`] - LMDB-backed record and blob storage
//! - [`reference_lookup::ReferenceIndex`] - finds records mentioning a document
//! - [`reference_nullifier::nullify_references`] - nulls `dataSource` objects pointing at a document
//! - [`attachment_cleanup::cleanup_attachment_structure`] - collapses emptied attachment wrappers
//! - [`document_deletion::DocumentDeletionService`] - ties the above together
//!
//! ## Quick Start
//!
//! ```no_run
//! use internal_storage_core::document_deletion::DocumentDeletionService;
//! use internal_storage_core::storage_config::StorageConfig;
//! use internal_storage_core::storage_state::AppStorageState;
//!
//! let state = AppStorageState::init(StorageConfig::for_name("internal_storage"))?;
//! let service = DocumentDeletionService::new(&state, &state, &state);
//!
//! let references = service.get_document_references("doc-1", "correlation-1")?;
//! println!("{} datasets reference doc-1", references.dataset_ids.len());
//!
//! service.delete_document("doc-1", "correlation-1")?;
//! # Ok::<(), internal_storage_core::app_response::AppResponse>(())
//! ```
//!
//! ## FFI Functions
//!
//! Every function taking or returning data uses JSON strings; results are
//! serialized [`app_response::AppResponse`] values and must be released with
//! [`free_response`].
//!
//! - [`open_storage`] / [`open_storage_with_config`] - open a storage instance
//! - [`store_dataset`], [`store_data_point`], [`store_blob`] - write records
//! - [`select_data`] - read a dataset or data point by id
//! - [`get_document_references`] - list records referencing a document
//! - [`delete_document`] - remove references and delete a document
//! - [`close_storage`] - flush and release a storage instance

pub mod app_response;
pub mod attachment_cleanup;
pub mod document_deletion;
pub mod json_encoding;
pub mod reference_lookup;
pub mod reference_nullifier;
pub mod repository;
pub mod storage_config;
pub mod storage_model;
pub mod storage_state;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{debug, info, warn};

use crate::app_response::AppResponse;
use crate::document_deletion::DocumentDeletionService;
use crate::repository::RecordRepository;
use crate::storage_config::StorageConfig;
use crate::storage_model::{BlobItem, DataItem, DataPointItem};
use crate::storage_state::AppStorageState;

/// Opens the storage `<name>.lmdb` with default settings.
///
/// # Returns
///
/// A pointer to the [`AppStorageState`], or null if the name is null, not
/// UTF-8, or the environment cannot be opened. Release it with [`close_storage`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use internal_storage_core::{open_storage, close_storage};
///
/// let name = CString::new("internal_storage").unwrap();
/// let state = open_storage(name.as_ptr());
/// assert!(!state.is_null());
/// close_storage(state);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn open_storage(name: *const c_char) -> *mut AppStorageState {
    if name.is_null() {
        warn!("Null name pointer passed to open_storage");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    init_state(StorageConfig::for_name(name_str))
}

/// Opens a storage described by a JSON [`StorageConfig`].
///
/// ```json
/// {"name": "internal_storage", "mapSize": 1073741824, "referenceMatch": "dataSource"}
/// ```
///
/// Returns null if the configuration is missing, malformed or invalid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn open_storage_with_config(config_json: *const c_char) -> *mut AppStorageState {
    if config_json.is_null() {
        warn!("Null config pointer passed to open_storage_with_config");
        return std::ptr::null_mut();
    }

    let json = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match StorageConfig::from_json_str(json) {
        Ok(config) => init_state(config),
        Err(e) => {
            warn!("Rejected storage configuration: {e}");
            std::ptr::null_mut()
        }
    }
}

fn init_state(config: StorageConfig) -> *mut AppStorageState {
    let storage_dir = config.storage_dir();
    info!("Attempting to open storage at: {}", storage_dir);

    match AppStorageState::init(config) {
        Ok(state) => {
            info!("✅ Storage initialized successfully");
            Box::into_raw(Box::new(state))
        }
        Err(e) => {
            warn!("❌ Failed to initialize storage at {}: {}", storage_dir, e);
            std::ptr::null_mut()
        }
    }
}

/// Stores (inserts or overwrites) a dataset.
///
/// Expected JSON: `{"id": "<dataset id>", "data": "<stored dataset text>"}`.
/// On success the response carries the stored dataset as JSON.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn store_dataset(state: *mut AppStorageState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "store_dataset") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(err) => return err,
    };

    let dataset: DataItem = match serde_json::from_str(&json_str) {
        Ok(d) => d,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match RecordRepository::<DataItem>::save(state, dataset) {
        Ok(saved) => json_response(&saved),
        Err(e) => response_to_c_string(&e),
    }
}

/// Stores (inserts or overwrites) a data point.
///
/// Expected JSON:
/// `{"dataPointId": "...", "companyId": "...", "reportingPeriod": "...", "dataPointType": "...", "dataPoint": "..."}`.
/// The metadata fields may be omitted.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn store_data_point(state: *mut AppStorageState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "store_data_point") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(err) => return err,
    };

    let data_point: DataPointItem = match serde_json::from_str(&json_str) {
        Ok(d) => d,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match RecordRepository::<DataPointItem>::save(state, data_point) {
        Ok(saved) => json_response(&saved),
        Err(e) => response_to_c_string(&e),
    }
}

/// Stores a document's bytes under `blob_id`.
///
/// `bytes` may be null only when `len` is zero.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn store_blob(
    state: *mut AppStorageState,
    blob_id: *const c_char,
    bytes: *const u8,
    len: usize,
) -> *const c_char {
    let state = match state_ref(state, "store_blob") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let blob_id = match c_ptr_to_string(blob_id, "blob id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    let blob: Vec<u8> = if len == 0 {
        Vec::new()
    } else if bytes.is_null() {
        let error = AppResponse::BadRequest("Null bytes pointer with non-zero length".to_string());
        return response_to_c_string(&error);
    } else {
        unsafe { std::slice::from_raw_parts(bytes, len) }.to_vec()
    };

    match state.save_blob(BlobItem::new(blob_id.clone(), blob)) {
        Ok(_) => response_to_c_string(&AppResponse::success(format!("Stored blob {blob_id}"))),
        Err(e) => response_to_c_string(&e),
    }
}

/// Returns the stored text of the dataset with this id, or of the data point
/// with this id if there is no such dataset.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn select_data(state: *mut AppStorageState, data_id: *const c_char) -> *const c_char {
    let state = match state_ref(state, "select_data") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let data_id = match c_ptr_to_string(data_id, "data id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    match state.select_data(&data_id) {
        Ok(data) => response_to_c_string(&AppResponse::Ok(data)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Lists the datasets and data points referencing a document.
///
/// On success the response carries `{"datasetIds": [...], "dataPointIds": [...]}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_document_references(
    state: *mut AppStorageState,
    document_id: *const c_char,
    correlation_id: *const c_char,
) -> *const c_char {
    let state = match state_ref(state, "get_document_references") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let (document_id, correlation_id) = match document_args(document_id, correlation_id) {
        Ok(args) => args,
        Err(err) => return err,
    };

    match deletion_service(state).get_document_references(&document_id, &correlation_id) {
        Ok(references) => json_response(&references),
        Err(e) => response_to_c_string(&e),
    }
}

/// Removes every reference to a document from stored datasets and data
/// points, then deletes the document's blob.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use internal_storage_core::{delete_document, open_storage};
///
/// let name = CString::new("internal_storage").unwrap();
/// let state = open_storage(name.as_ptr());
///
/// let document_id = CString::new("doc-1").unwrap();
/// let correlation_id = CString::new("correlation-1").unwrap();
/// let result = delete_document(state, document_id.as_ptr(), correlation_id.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_document(
    state: *mut AppStorageState,
    document_id: *const c_char,
    correlation_id: *const c_char,
) -> *const c_char {
    let state = match state_ref(state, "delete_document") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let (document_id, correlation_id) = match document_args(document_id, correlation_id) {
        Ok(args) => args,
        Err(err) => return err,
    };

    match deletion_service(state).delete_document(&document_id, &correlation_id) {
        Ok(()) => response_to_c_string(&AppResponse::success(format!("Deleted document {document_id}"))),
        Err(e) => response_to_c_string(&e),
    }
}

/// Flushes and releases a storage instance. The pointer must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_storage(state: *mut AppStorageState) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_storage".to_string());
        return response_to_c_string(&error);
    }

    let state = unsafe { *Box::from_raw(state) };

    match state.close() {
        Ok(()) => response_to_c_string(&AppResponse::success("Storage closed successfully")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Releases a string returned by any function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

fn deletion_service(
    state: &AppStorageState,
) -> DocumentDeletionService<&AppStorageState, &AppStorageState, &AppStorageState> {
    DocumentDeletionService::new(state, state, state).with_reference_match(state.config().reference_match)
}

fn state_ref<'a>(state: *mut AppStorageState, caller: &str) -> Result<&'a AppStorageState, *const c_char> {
    match unsafe { state.as_ref() } {
        Some(s) => Ok(s),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn document_args(
    document_id: *const c_char,
    correlation_id: *const c_char,
) -> Result<(String, String), *const c_char> {
    let document_id = c_ptr_to_string(document_id, "document id")?;
    let correlation_id = c_ptr_to_string(correlation_id, "correlation id")?;
    Ok((document_id, correlation_id))
}

/// Wraps a serializable value as the payload of an [`AppResponse::Ok`].
fn json_response<T: serde::Serialize>(value: &T) -> *const c_char {
    match serde_json::to_string(value) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Converts an [`AppResponse`] to a C-compatible string.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    if !response.is_ok() {
        debug!("Returning error response: {response}");
    }

    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String.
///
/// On failure the error is an already serialized `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
