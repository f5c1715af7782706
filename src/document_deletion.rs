//! Document deletion with reference cleanup.
//!
//! Deleting a document happens in two phases:
//!
//! 1. every dataset and data point that references the document is rewritten
//!    with those references replaced by `null`;
//! 2. the document's blob is removed.
//!
//! The blob is only removed once every referencing record has been persisted,
//! so a failure in phase 1 leaves the document in place. Records are updated
//! one by one without a spanning transaction; a failed run can be repeated
//! safely since already cleaned records are left untouched.

use log::{error, info, warn};
use serde_json::Value;

use crate::app_response::AppResponse;
use crate::attachment_cleanup::cleanup_attachment_structure;
use crate::json_encoding::EncodedJson;
use crate::reference_lookup::ReferenceIndex;
use crate::reference_nullifier::{nullify_references, ReferenceMatch};
use crate::repository::{BlobRepository, RecordRepository};
use crate::storage_model::{DataItem, DataPointItem, DocumentReferencesResponse, StoredRecord};

/// Field of the dataset wrapper holding the framework content.
pub const DATASET_CONTENT_FIELD: &str = "data";

pub struct DocumentDeletionService<D, P, B> {
    datasets: D,
    data_points: P,
    blobs: B,
    reference_match: ReferenceMatch,
}

impl<D, P, B> DocumentDeletionService<D, P, B>
where
    D: RecordRepository<DataItem>,
    P: RecordRepository<DataPointItem>,
    B: BlobRepository,
{
    pub fn new(datasets: D, data_points: P, blobs: B) -> Self {
        Self {
            datasets,
            data_points,
            blobs,
            reference_match: ReferenceMatch::default(),
        }
    }

    pub fn with_reference_match(mut self, reference_match: ReferenceMatch) -> Self {
        self.reference_match = reference_match;
        self
    }

    /// Ids of all datasets and data points whose content mentions `document_id`.
    pub fn get_document_references(
        &self,
        document_id: &str,
        correlation_id: &str,
    ) -> Result<DocumentReferencesResponse, AppResponse> {
        info!(
            "Searching for document references. DocumentId: {}. Correlation ID: {}",
            document_id, correlation_id
        );

        let index = ReferenceIndex::new(&self.datasets, &self.data_points);
        let data_point_ids = index.find_referencing_data_points(document_id)?;
        let dataset_ids = index.find_referencing_datasets(document_id)?;

        info!(
            "Found document references. DocumentId: {}. DataPoints: {}, Datasets: {}. Correlation ID: {}",
            document_id,
            data_point_ids.len(),
            dataset_ids.len(),
            correlation_id
        );

        Ok(DocumentReferencesResponse {
            dataset_ids,
            data_point_ids,
        })
    }

    /// Removes every reference to `document_id`, then deletes the document's blob.
    pub fn delete_document(&self, document_id: &str, correlation_id: &str) -> Result<(), AppResponse> {
        info!(
            "Deleting document from blob storage. DocumentId: {}. Matching: {:?}. Correlation ID: {}",
            document_id, self.reference_match, correlation_id
        );

        let references = self.get_document_references(document_id, correlation_id)?;
        if references.is_empty() {
            info!(
                "No records reference document {}. Correlation ID: {}",
                document_id, correlation_id
            );
        } else {
            self.nullify_all(&references, document_id, correlation_id)?;
        }

        let removed = self.blobs.delete_by_id(document_id).map_err(|e| {
            error!(
                "Failed to delete document blob. DocumentId: {}. Correlation ID: {}. {}",
                document_id, correlation_id, e
            );
            e
        })?;
        if !removed {
            warn!(
                "Document {} was not present in blob storage. Correlation ID: {}",
                document_id, correlation_id
            );
        }

        info!(
            "Successfully deleted document. DocumentId: {}. Correlation ID: {}",
            document_id, correlation_id
        );
        Ok(())
    }

    /// Rewrites every referencing record, stopping at the first failure.
    fn nullify_all(
        &self,
        references: &DocumentReferencesResponse,
        document_id: &str,
        correlation_id: &str,
    ) -> Result<(), AppResponse> {
        let mut datasets_updated = 0;
        for dataset_id in &references.dataset_ids {
            if self.nullify_in_dataset(dataset_id, document_id, correlation_id)? {
                datasets_updated += 1;
            }
        }

        let mut data_points_updated = 0;
        for data_point_id in &references.data_point_ids {
            if self.nullify_in_data_point(data_point_id, document_id, correlation_id)? {
                data_points_updated += 1;
            }
        }

        info!(
            "Nullified file references for document {}. Datasets updated: {}, Data points updated: {}. Correlation ID: {}",
            document_id, datasets_updated, data_points_updated, correlation_id
        );
        Ok(())
    }

    /// Rewrites one dataset. The wrapper and its `data` field are each decoded
    /// and re-encoded at the depth they were stored with.
    fn nullify_in_dataset(&self, dataset_id: &str, document_id: &str, correlation_id: &str) -> Result<bool, AppResponse> {
        let Some(dataset) = self.datasets.find_by_id(dataset_id)? else {
            warn!("Dataset {} not found. Correlation ID: {}", dataset_id, correlation_id);
            return Ok(false);
        };

        let mut wrapper = EncodedJson::decode_text(dataset.content())
            .map_err(|e| report_malformed(&dataset, document_id, correlation_id, e))?;

        let Some(fields) = wrapper.value.as_object_mut() else {
            let e = AppResponse::SerializationError(format!(
                "Dataset {} is not stored as a JSON object",
                dataset_id
            ));
            return Err(report_malformed(&dataset, document_id, correlation_id, e));
        };

        let raw_content = match fields.get(DATASET_CONTENT_FIELD) {
            Some(Value::Null) | None => {
                warn!("Dataset {} has no 'data' field. Correlation ID: {}", dataset_id, correlation_id);
                return Ok(false);
            }
            Some(content) => content.clone(),
        };

        let mut content = EncodedJson::decode_value(raw_content)
            .map_err(|e| report_malformed(&dataset, document_id, correlation_id, e))?;

        if !self.remove_references(&mut content.value, document_id) {
            return Ok(false);
        }

        fields.insert(DATASET_CONTENT_FIELD.to_string(), content.encode_value()?);
        self.datasets.save(dataset.with_content(wrapper.encode_text()?))?;

        info!(
            "Nullified references in dataset {}. Correlation ID: {}",
            dataset_id, correlation_id
        );
        Ok(true)
    }

    fn nullify_in_data_point(
        &self,
        data_point_id: &str,
        document_id: &str,
        correlation_id: &str,
    ) -> Result<bool, AppResponse> {
        let Some(data_point) = self.data_points.find_by_id(data_point_id)? else {
            warn!("Datapoint {} not found. Correlation ID: {}", data_point_id, correlation_id);
            return Ok(false);
        };

        let mut content = EncodedJson::decode_text(data_point.content())
            .map_err(|e| report_malformed(&data_point, document_id, correlation_id, e))?;

        if !self.remove_references(&mut content.value, document_id) {
            return Ok(false);
        }

        self.data_points
            .save(data_point.with_content(content.encode_text()?))?;

        info!(
            "Nullified references in datapoint {}. Correlation ID: {}",
            data_point_id, correlation_id
        );
        Ok(true)
    }

    /// Runs the nullifier and then the attachment cleanup; both always run.
    fn remove_references(&self, tree: &mut Value, document_id: &str) -> bool {
        let references_nullified = nullify_references(tree, document_id, self.reference_match);
        let attachment_cleaned = cleanup_attachment_structure(tree);
        references_nullified || attachment_cleaned
    }
}

fn report_malformed<R: StoredRecord>(
    record: &R,
    document_id: &str,
    correlation_id: &str,
    err: AppResponse,
) -> AppResponse {
    error!(
        "Malformed JSON in {} {} while removing references to document {}. Correlation ID: {}. {}",
        R::KIND,
        record.id(),
        document_id,
        correlation_id,
        err
    );
    err
}
