//! Persistent key/value storage.
//!
//! The core never assumes a storage technology. It talks to a
//! [`RecordStore`], which hosts implement over whatever they have: a
//! database, files, browser storage. [`MemoryStore`] is the in-process
//! implementation used by tests and short-lived hosts.

use crate::error::{Error, Result};
use crate::model::FormulaDefinition;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Byte-oriented record storage keyed by strings.
///
/// Writes are upserts. Deleting an absent key is not an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Every record whose key starts with `prefix`, ordered by key.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
}

/// A [`RecordStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.records.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.records.write().remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .records
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Formula definitions persisted as JSON records under `formula/{id}`.
#[derive(Clone)]
pub struct FormulaRepository {
    store: Arc<dyn RecordStore>,
}

const FORMULA_PREFIX: &str = "formula/";

impl FormulaRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn key(id: &str) -> String {
        format!("{}{}", FORMULA_PREFIX, id)
    }

    pub async fn save(&self, definition: &FormulaDefinition) -> Result<()> {
        let bytes = serde_json::to_vec(definition).map_err(Error::storage)?;
        self.store.put(&Self::key(&definition.id), bytes).await
    }

    pub async fn load(&self, id: &str) -> Result<Option<FormulaDefinition>> {
        match self.store.get(&Self::key(id)).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| Error::storage(format!("formula `{}`: {}", id, err))),
            None => Ok(None),
        }
    }

    /// Every stored definition, ordered by id.
    pub async fn list(&self) -> Result<Vec<FormulaDefinition>> {
        self.store
            .scan_prefix(FORMULA_PREFIX)
            .await?
            .into_iter()
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes)
                    .map_err(|err| Error::storage(format!("record `{}`: {}", key, err)))
            })
            .collect()
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete(&Self::key(id)).await
    }
}
