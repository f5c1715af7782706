//! Storage configuration.
//!
//! The host passes configuration as JSON (camelCase keys), the same way every
//! other value crosses the C boundary:
//!
//! ```json
//! {
//!   "name": "internal_storage",
//!   "mapSize": 1073741824,
//!   "maxReaders": 126,
//!   "referenceMatch": "dataSource"
//! }
//! ```
//!
//! Every field except `name` is optional.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::reference_nullifier::ReferenceMatch;

pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;
pub const DEFAULT_MAX_READERS: u32 = 126;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Storage name. The LMDB environment is created in `<name>.lmdb`.
    pub name: String,
    #[serde(default = "default_map_size")]
    pub map_size: usize,
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,
    #[serde(default)]
    pub reference_match: ReferenceMatch,
}

fn default_map_size() -> usize {
    DEFAULT_MAP_SIZE
}

fn default_max_readers() -> u32 {
    DEFAULT_MAX_READERS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::for_name("internal_storage")
    }
}

impl StorageConfig {
    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map_size: DEFAULT_MAP_SIZE,
            max_readers: DEFAULT_MAX_READERS,
            reference_match: ReferenceMatch::default(),
        }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, AppResponse> {
        let config: StorageConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.name.trim().is_empty() {
            return Err(AppResponse::ValidationError(
                "Storage name must not be empty".to_string(),
            ));
        }
        if self.map_size == 0 {
            return Err(AppResponse::ValidationError(
                "mapSize must be greater than zero".to_string(),
            ));
        }
        if self.max_readers == 0 {
            return Err(AppResponse::ValidationError(
                "maxReaders must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding the LMDB environment.
    pub fn storage_dir(&self) -> String {
        format!("{}.lmdb", self.name)
    }
}
