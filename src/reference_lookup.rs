//! Candidate search for records that mention a document.
//!
//! The lookup is a plain substring search over stored record text. It may
//! return records that mention the id somewhere other than a `fileReference`;
//! [`crate::reference_nullifier`] decides what is an actual reference.

use std::collections::BTreeSet;

use crate::app_response::AppResponse;
use crate::repository::RecordRepository;
use crate::storage_model::{DataItem, DataPointItem, StoredRecord};

pub struct ReferenceIndex<'a, D, P> {
    datasets: &'a D,
    data_points: &'a P,
}

impl<'a, D, P> ReferenceIndex<'a, D, P>
where
    D: RecordRepository<DataItem>,
    P: RecordRepository<DataPointItem>,
{
    pub fn new(datasets: &'a D, data_points: &'a P) -> Self {
        Self {
            datasets,
            data_points,
        }
    }

    pub fn find_referencing_datasets(&self, document_id: &str) -> Result<BTreeSet<String>, AppResponse> {
        find_referencing(self.datasets, document_id)
    }

    pub fn find_referencing_data_points(&self, document_id: &str) -> Result<BTreeSet<String>, AppResponse> {
        find_referencing(self.data_points, document_id)
    }
}

fn find_referencing<R, S>(repository: &S, document_id: &str) -> Result<BTreeSet<String>, AppResponse>
where
    R: StoredRecord,
    S: RecordRepository<R>,
{
    validate_document_id(document_id)?;

    let mut ids = BTreeSet::new();
    for needle in search_needles(document_id)? {
        ids.extend(
            repository
                .find_by_content_containing(&needle)?
                .iter()
                .map(|record| record.id().to_string()),
        );
    }
    Ok(ids)
}

pub fn validate_document_id(document_id: &str) -> Result<(), AppResponse> {
    if document_id.is_empty() {
        return Err(AppResponse::ValidationError(
            "Document id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// The document id as it appears in stored text: verbatim, and escaped for one
/// to three levels of JSON string encoding. A double-encoded dataset keeps its
/// framework content three levels deep.
///
/// Ids made of plain characters (hashes, UUIDs) yield a single needle.
pub(crate) fn search_needles(document_id: &str) -> Result<Vec<String>, AppResponse> {
    let mut needles = vec![document_id.to_string()];
    for _ in 0..3 {
        let previous = needles[needles.len() - 1].clone();
        let quoted = serde_json::to_string(&previous)?;
        let escaped = quoted[1..quoted.len() - 1].to_string();
        if escaped != previous {
            needles.push(escaped);
        }
    }
    Ok(needles)
}
