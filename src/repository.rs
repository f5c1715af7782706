//! Storage ports used by the reference tracking and deletion code.
//!
//! The deletion service receives its repositories through its constructor.
//! [`crate::storage_state::AppStorageState`] implements every port on top of
//! LMDB; tests substitute in-memory fakes.

use crate::app_response::AppResponse;
use crate::storage_model::StoredRecord;

/// Access to one table of JSON-text records (datasets or data points).
pub trait RecordRepository<R: StoredRecord> {
    /// Returns `Ok(None)` when no record has this id.
    fn find_by_id(&self, id: &str) -> Result<Option<R>, AppResponse>;

    /// Inserts or overwrites the record under its id.
    fn save(&self, record: R) -> Result<R, AppResponse>;

    /// Every record whose stored content contains `needle` as a substring.
    fn find_by_content_containing(&self, needle: &str) -> Result<Vec<R>, AppResponse>;
}

/// Access to stored documents.
pub trait BlobRepository {
    /// Removes the blob. Returns `Ok(false)` if it did not exist.
    fn delete_by_id(&self, blob_id: &str) -> Result<bool, AppResponse>;
}

impl<R: StoredRecord, T: RecordRepository<R> + ?Sized> RecordRepository<R> for &T {
    fn find_by_id(&self, id: &str) -> Result<Option<R>, AppResponse> {
        (**self).find_by_id(id)
    }

    fn save(&self, record: R) -> Result<R, AppResponse> {
        (**self).save(record)
    }

    fn find_by_content_containing(&self, needle: &str) -> Result<Vec<R>, AppResponse> {
        (**self).find_by_content_containing(needle)
    }
}

impl<T: BlobRepository + ?Sized> BlobRepository for &T {
    fn delete_by_id(&self, blob_id: &str) -> Result<bool, AppResponse> {
        (**self).delete_by_id(blob_id)
    }
}
