//! Removal of document references from JSON content.
//!
//! A document reference is an object carrying a `fileReference` field, e.g.
//!
//! ```json
//! {"value": "Yes", "dataSource": {"fileName": "report.pdf", "fileReference": "<document id>"}}
//! ```
//!
//! Removing a reference replaces the whole reference object with `null`; the
//! sibling metadata (`fileName`, `publicationDate`, ...) goes with it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DATA_SOURCE_FIELD: &str = "dataSource";
pub const FILE_REFERENCE_FIELD: &str = "fileReference";

/// Which object fields count as document references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceMatch {
    /// Only fields named `dataSource` whose value references the document.
    #[default]
    DataSource,
    /// Any field whose value references the document.
    AnyFileReference,
}

/// Replaces every reference to `document_id` in `tree` with `null`.
///
/// Arrays are walked element by element; an element that is itself a matching
/// reference object is replaced by `null` under either strategy. Returns
/// `true` if anything was replaced. Running it again on the result is a no-op.
pub fn nullify_references(tree: &mut Value, document_id: &str, strategy: ReferenceMatch) -> bool {
    ReferenceNullifier {
        document_id,
        strategy,
    }
    .visit(tree)
}

/// Whether `node` is an object whose `fileReference` is exactly `document_id`.
pub fn references_document(node: &Value, document_id: &str) -> bool {
    node.get(FILE_REFERENCE_FIELD).and_then(Value::as_str) == Some(document_id)
}

struct ReferenceNullifier<'a> {
    document_id: &'a str,
    strategy: ReferenceMatch,
}

impl ReferenceNullifier<'_> {
    fn visit(&self, node: &mut Value) -> bool {
        match node {
            Value::Object(fields) => self.visit_object(fields),
            Value::Array(items) => self.visit_array(items),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
        }
    }

    fn visit_object(&self, fields: &mut Map<String, Value>) -> bool {
        let mut modified = false;
        for (name, value) in fields.iter_mut() {
            if self.is_reference_field(name, value) {
                *value = Value::Null;
                modified = true;
            } else {
                modified |= self.visit(value);
            }
        }
        modified
    }

    fn visit_array(&self, items: &mut [Value]) -> bool {
        let mut modified = false;
        for item in items.iter_mut() {
            if references_document(item, self.document_id) {
                *item = Value::Null;
                modified = true;
            } else {
                modified |= self.visit(item);
            }
        }
        modified
    }

    fn is_reference_field(&self, name: &str, value: &Value) -> bool {
        let name_matches = match self.strategy {
            ReferenceMatch::DataSource => name == DATA_SOURCE_FIELD,
            ReferenceMatch::AnyFileReference => true,
        };
        name_matches && references_document(value, self.document_id)
    }
}
