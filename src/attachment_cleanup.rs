//! Collapses emptied attachment wrappers.
//!
//! Some frameworks model an optional attachment as
//! `attachment.attachment.attachment = {"value": ..., "dataSource": ...}`.
//! Once the innermost `dataSource` has been nulled the attachment no longer
//! exists, and the schema expects the innermost `attachment` field itself to be
//! `null` rather than an object with a dangling value. The middle level stays
//! an object:
//!
//! ```json
//! {"attachment": {"attachment": {"attachment": null}}}
//! ```

use log::info;
use serde_json::Value;

use crate::reference_nullifier::DATA_SOURCE_FIELD;

pub const ATTACHMENT_FIELD: &str = "attachment";

/// Sets `attachment.attachment.attachment` to `null` when its `dataSource` is
/// an explicit `null`.
///
/// Only the path starting at the root of `tree` is considered. Any missing or
/// non-object level makes this a no-op. Returns `true` if the tree changed.
pub fn cleanup_attachment_structure(tree: &mut Value) -> bool {
    let Some(middle) = tree
        .get_mut(ATTACHMENT_FIELD)
        .and_then(|outer| outer.get_mut(ATTACHMENT_FIELD))
        .and_then(Value::as_object_mut)
    else {
        return false;
    };

    let source_nulled = middle
        .get(ATTACHMENT_FIELD)
        .and_then(Value::as_object)
        .and_then(|inner| inner.get(DATA_SOURCE_FIELD))
        .is_some_and(Value::is_null);

    if source_nulled {
        middle.insert(ATTACHMENT_FIELD.to_string(), Value::Null);
        info!("Attachment cleaned");
    }
    source_nulled
}
