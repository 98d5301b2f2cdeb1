//! Implémentation durable du store, sur SQLite
//!
//! Une table par collection déclarée, plus une table `schema_meta` qui garde
//! la version de schéma la plus haute jamais ouverte.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::{Collection, KvStore, Result, StoreError, StoreSchema};

/// Délai d'attente quand un autre processus tient un verrou d'écriture
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Store clé/valeur durable
///
/// Note : les accès sont sérialisés par le Mutex interne de la connexion,
/// SQLite assurant l'atomicité de chaque écriture.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    collections: HashSet<&'static str>,
    version: u32,
}

impl SqliteStore {
    /// Ouvre (ou crée) la base et applique le schéma
    ///
    /// L'ouverture est idempotente : les collections absentes sont créées,
    /// les existantes sont conservées telles quelles, y compris celles que le
    /// schéma courant ne déclare plus.
    ///
    /// # Arguments
    ///
    /// * `path` - Chemin vers le fichier de base de données SQLite
    /// * `schema` - Version et collections déclarées
    pub fn open(path: &Path, schema: &StoreSchema) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn, schema)
    }

    /// Ouvre une base SQLite en mémoire avec le schéma donné
    pub fn open_in_memory(schema: &StoreSchema) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, schema)
    }

    fn init(conn: Connection, schema: &StoreSchema) -> Result<Self> {
        schema.validate()?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_meta (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                version INTEGER NOT NULL
            )",
            [],
        )?;

        let stored: Option<u32> = conn
            .query_row("SELECT version FROM schema_meta WHERE id = 0", [], |row| {
                row.get(0)
            })
            .optional()?;

        for collection in schema.collections {
            let create_table_sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                collection.name()
            );
            conn.execute(&create_table_sql, [])?;
        }

        // La version ne redescend jamais : une base écrite par une version plus
        // récente reste lisible pour les collections que l'on connaît.
        let version = stored.map_or(schema.version, |v| v.max(schema.version));
        conn.execute(
            "INSERT INTO schema_meta (id, version) VALUES (0, ?1)
             ON CONFLICT(id) DO UPDATE SET version = excluded.version",
            params![version],
        )?;

        match stored {
            Some(v) if v < schema.version => {
                tracing::info!(from = v, to = schema.version, "Upgraded store schema");
            }
            Some(v) if v > schema.version => {
                tracing::warn!(
                    stored = v,
                    declared = schema.version,
                    "Store was written by a newer schema version"
                );
            }
            None => tracing::debug!(version, "Initialized new store"),
            _ => {}
        }

        Ok(Self {
            conn: Mutex::new(conn),
            collections: schema.collections.iter().map(|c| c.name()).collect(),
            version,
        })
    }

    /// Version de schéma enregistrée dans la base
    pub fn schema_version(&self) -> u32 {
        self.version
    }

    fn ensure_declared(&self, collection: Collection) -> Result<()> {
        if self.collections.contains(collection.name()) {
            Ok(())
        } else {
            Err(StoreError::UnknownCollection(collection.name().to_string()))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        self.ensure_declared(collection)?;
        let conn = self.lock()?;
        let sql = format!("SELECT value FROM {} WHERE key = ?1", collection.name());

        let raw: Option<String> = conn
            .query_row(&sql, [key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, collection: Collection, key: &str, value: &Value) -> Result<()> {
        self.ensure_declared(collection)?;
        let text = serde_json::to_string(value)?;
        let conn = self.lock()?;
        let sql = format!(
            "INSERT INTO {} (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            collection.name()
        );

        conn.execute(&sql, params![key, text, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        self.ensure_declared(collection)?;
        let conn = self.lock()?;
        let sql = format!("DELETE FROM {} WHERE key = ?1", collection.name());
        let removed = conn.execute(&sql, [key])?;
        Ok(removed > 0)
    }

    async fn keys(&self, collection: Collection) -> Result<Vec<String>> {
        self.ensure_declared(collection)?;
        let conn = self.lock()?;
        let sql = format!("SELECT key FROM {} ORDER BY key ASC", collection.name());

        let mut stmt = conn.prepare(&sql)?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(keys)
    }
}
