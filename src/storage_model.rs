//! Record types persisted by the internal storage.
//!
//! Datasets ([`DataItem`]) and data points ([`DataPointItem`]) keep their
//! content as JSON *text*, exactly as the upload flows produced it. That text
//! may be single- or double-encoded; see [`crate::json_encoding`]. Documents
//! ([`BlobItem`]) are opaque bytes keyed by their content hash.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A record whose content is a JSON text that can be searched and rewritten.
///
/// Implemented by both [`DataItem`] and [`DataPointItem`] so repositories and
/// the reference tracking code can treat them uniformly.
pub trait StoredRecord: Clone {
    /// Human readable record kind, used in log lines.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// The stored JSON text.
    fn content(&self) -> &str;

    /// Returns a copy of this record with its content replaced.
    fn with_content(&self, content: String) -> Self;
}

/// A stored dataset.
///
/// `data` holds the wrapper object
/// `{"companyId", "dataType", "reportingPeriod", "data"}` serialized as text,
/// where the inner `data` field is itself a JSON-encoded string.
///
/// ```rust
/// use internal_storage_core::storage_model::{DataItem, StoredRecord};
///
/// let item = DataItem::new("dataset-1", r#"{"companyId":"c","dataType":"lksg","reportingPeriod":"2025","data":"{}"}"#);
/// assert_eq!(item.id(), "dataset-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: String,
    pub data: String,
}

impl DataItem {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }
}

impl StoredRecord for DataItem {
    const KIND: &'static str = "dataset";

    fn id(&self) -> &str {
        &self.id
    }

    fn content(&self) -> &str {
        &self.data
    }

    fn with_content(&self, content: String) -> Self {
        Self {
            id: self.id.clone(),
            data: content,
        }
    }
}

/// A stored data point of the per-datapoint upload model.
///
/// `data_point` is the data point's JSON content, directly or as a JSON-encoded
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPointItem {
    pub data_point_id: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub reporting_period: String,
    #[serde(default)]
    pub data_point_type: String,
    pub data_point: String,
}

impl DataPointItem {
    /// Creates a data point with empty metadata.
    pub fn new(data_point_id: impl Into<String>, data_point: impl Into<String>) -> Self {
        Self {
            data_point_id: data_point_id.into(),
            company_id: String::new(),
            reporting_period: String::new(),
            data_point_type: String::new(),
            data_point: data_point.into(),
        }
    }
}

impl StoredRecord for DataPointItem {
    const KIND: &'static str = "data point";

    fn id(&self) -> &str {
        &self.data_point_id
    }

    fn content(&self) -> &str {
        &self.data_point
    }

    fn with_content(&self, content: String) -> Self {
        Self {
            data_point: content,
            ..self.clone()
        }
    }
}

/// A content-addressed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub blob_id: String,
    pub blob: Vec<u8>,
}

impl BlobItem {
    pub fn new(blob_id: impl Into<String>, blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob_id: blob_id.into(),
            blob: blob.into(),
        }
    }
}

/// Ids of every record whose content mentions a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReferencesResponse {
    pub dataset_ids: BTreeSet<String>,
    pub data_point_ids: BTreeSet<String>,
}

impl DocumentReferencesResponse {
    pub fn is_empty(&self) -> bool {
        self.dataset_ids.is_empty() && self.data_point_ids.is_empty()
    }
}
