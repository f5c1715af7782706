//! LMDB-backed storage for datasets, data points and documents.
//!
//! One LMDB environment holds three named databases:
//!
//! - `data_items` - [`DataItem`] rows serialized as JSON, keyed by dataset id
//! - `data_point_items` - [`DataPointItem`] rows serialized as JSON, keyed by data point id
//! - `blob_items` - raw document bytes, keyed by document id
//!
//! Every write runs in its own write transaction; LMDB serializes writers, so
//! the state can be shared between threads.

use std::path::Path;

use lmdb::{Cursor, Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::repository::{BlobRepository, RecordRepository};
use crate::storage_config::StorageConfig;
use crate::storage_model::{BlobItem, DataItem, DataPointItem, StoredRecord};

const DATA_ITEMS_DB: &str = "data_items";
const DATA_POINT_ITEMS_DB: &str = "data_point_items";
const BLOB_ITEMS_DB: &str = "blob_items";

pub struct AppStorageState {
    env: Environment,
    data_items: Database,
    data_point_items: Database,
    blob_items: Database,
    config: StorageConfig,
}

impl AppStorageState {
    /// Opens (or creates) the storage described by `config`.
    pub fn init(config: StorageConfig) -> Result<Self, AppResponse> {
        config.validate()?;

        let storage_dir = config.storage_dir();
        std::fs::create_dir_all(&storage_dir)?;

        let env = Environment::new()
            .set_max_dbs(3)
            .set_map_size(config.map_size)
            .set_max_readers(config.max_readers)
            .open(Path::new(&storage_dir))?;

        let data_items = env.create_db(Some(DATA_ITEMS_DB), DatabaseFlags::empty())?;
        let data_point_items = env.create_db(Some(DATA_POINT_ITEMS_DB), DatabaseFlags::empty())?;
        let blob_items = env.create_db(Some(BLOB_ITEMS_DB), DatabaseFlags::empty())?;

        info!("Opened internal storage at {}", storage_dir);

        Ok(Self {
            env,
            data_items,
            data_point_items,
            blob_items,
            config,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Content of the dataset with this id, or of the data point with this id
    /// if no dataset matches.
    pub fn select_data(&self, data_id: &str) -> Result<String, AppResponse> {
        if let Some(dataset) = RecordRepository::<DataItem>::find_by_id(self, data_id)? {
            return Ok(dataset.data);
        }
        debug!("Dataset {} not found, searching data points", data_id);

        match RecordRepository::<DataPointItem>::find_by_id(self, data_id)? {
            Some(data_point) => Ok(data_point.data_point),
            None => Err(AppResponse::NotFound(format!(
                "No dataset or data point with the ID: {data_id} could be found in the data store"
            ))),
        }
    }

    pub fn delete_dataset(&self, dataset_id: &str) -> Result<bool, AppResponse> {
        self.delete_key(self.data_items, dataset_id)
    }

    pub fn delete_data_point(&self, data_point_id: &str) -> Result<bool, AppResponse> {
        self.delete_key(self.data_point_items, data_point_id)
    }

    pub fn save_blob(&self, blob: BlobItem) -> Result<BlobItem, AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.blob_items, &blob.blob_id, &blob.blob, WriteFlags::empty())?;
        txn.commit()?;
        Ok(blob)
    }

    pub fn find_blob_by_id(&self, blob_id: &str) -> Result<Option<BlobItem>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let blob = match txn.get(self.blob_items, &blob_id) {
            Ok(bytes) => Some(BlobItem::new(blob_id, bytes)),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(blob)
    }

    pub fn blob_exists(&self, blob_id: &str) -> Result<bool, AppResponse> {
        Ok(self.find_blob_by_id(blob_id)?.is_some())
    }

    /// Flushes pending writes and closes the environment.
    pub fn close(self) -> Result<(), AppResponse> {
        self.env.sync(true)?;
        info!("Closed internal storage at {}", self.config.storage_dir());
        Ok(())
    }

    fn get_record<R: DeserializeOwned>(&self, db: Database, id: &str) -> Result<Option<R>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let record = match txn.get(db, &id) {
            Ok(bytes) => Some(serde_json::from_slice(bytes)?),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(record)
    }

    fn put_record<R: Serialize + StoredRecord>(&self, db: Database, record: R) -> Result<R, AppResponse> {
        if record.id().is_empty() {
            return Err(AppResponse::ValidationError(format!(
                "Cannot store {} with an empty id",
                R::KIND
            )));
        }
        let json = serde_json::to_vec(&record)?;
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(db, &record.id(), &json, WriteFlags::empty())?;
        txn.commit()?;
        Ok(record)
    }

    fn scan_records<R>(&self, db: Database, needle: &str) -> Result<Vec<R>, AppResponse>
    where
        R: DeserializeOwned + StoredRecord,
    {
        let txn = self.env.begin_ro_txn()?;
        let mut matches = Vec::new();
        {
            let mut cursor = txn.open_ro_cursor(db)?;
            // A fresh cursor's `iter` starts at the first row and yields nothing
            // on an empty table; `iter_start` panics there.
            for (key, value) in cursor.iter() {
                let record: R = match serde_json::from_slice(value) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(
                            "Unreadable {} row {:?}: {e}",
                            R::KIND,
                            String::from_utf8_lossy(key)
                        );
                        return Err(e.into());
                    }
                };
                if record.content().contains(needle) {
                    matches.push(record);
                }
            }
        }
        Ok(matches)
    }

    fn delete_key(&self, db: Database, id: &str) -> Result<bool, AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(db, &id, None) {
            Ok(()) => {
                txn.commit()?;
                Ok(true)
            }
            Err(lmdb::Error::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl RecordRepository<DataItem> for AppStorageState {
    fn find_by_id(&self, id: &str) -> Result<Option<DataItem>, AppResponse> {
        self.get_record(self.data_items, id)
    }

    fn save(&self, record: DataItem) -> Result<DataItem, AppResponse> {
        self.put_record(self.data_items, record)
    }

    fn find_by_content_containing(&self, needle: &str) -> Result<Vec<DataItem>, AppResponse> {
        self.scan_records(self.data_items, needle)
    }
}

impl RecordRepository<DataPointItem> for AppStorageState {
    fn find_by_id(&self, id: &str) -> Result<Option<DataPointItem>, AppResponse> {
        self.get_record(self.data_point_items, id)
    }

    fn save(&self, record: DataPointItem) -> Result<DataPointItem, AppResponse> {
        self.put_record(self.data_point_items, record)
    }

    fn find_by_content_containing(&self, needle: &str) -> Result<Vec<DataPointItem>, AppResponse> {
        self.scan_records(self.data_point_items, needle)
    }
}

impl BlobRepository for AppStorageState {
    fn delete_by_id(&self, blob_id: &str) -> Result<bool, AppResponse> {
        self.delete_key(self.blob_items, blob_id)
    }
}
