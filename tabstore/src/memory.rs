//! Implémentation mémoire du store
//!
//! Même contrat que [`SqliteStore`](crate::SqliteStore), sans durabilité :
//! utilisée par les tests et comme repli quand la base ne peut pas être
//! ouverte.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use crate::{Collection, KvStore, Result, StoreError, StoreSchema};

#[derive(Debug)]
pub struct MemoryStore {
    collections: HashSet<&'static str>,
    data: RwLock<HashMap<&'static str, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new(schema: &StoreSchema) -> Result<Self> {
        schema.validate()?;
        Ok(Self {
            collections: schema.collections.iter().map(|c| c.name()).collect(),
            data: RwLock::new(HashMap::new()),
        })
    }

    fn ensure_declared(&self, collection: Collection) -> Result<()> {
        if self.collections.contains(collection.name()) {
            Ok(())
        } else {
            Err(StoreError::UnknownCollection(collection.name().to_string()))
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        self.ensure_declared(collection)?;
        let data = self.data.read().map_err(|_| Self::poisoned())?;
        Ok(data
            .get(collection.name())
            .and_then(|values| values.get(key))
            .cloned())
    }

    async fn set(&self, collection: Collection, key: &str, value: &Value) -> Result<()> {
        self.ensure_declared(collection)?;
        let mut data = self.data.write().map_err(|_| Self::poisoned())?;
        data.entry(collection.name())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        self.ensure_declared(collection)?;
        let mut data = self.data.write().map_err(|_| Self::poisoned())?;
        Ok(data
            .get_mut(collection.name())
            .map(|values| values.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn keys(&self, collection: Collection) -> Result<Vec<String>> {
        self.ensure_declared(collection)?;
        let data = self.data.read().map_err(|_| Self::poisoned())?;
        Ok(data
            .get(collection.name())
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default())
    }
}
