//! # tabstore - Stockage clé/valeur embarqué pour Tabula
//!
//! Cette crate fournit l'adaptateur de stockage durable utilisé par toutes les
//! autres crates : une base SQLite (ou une implémentation mémoire) organisée en
//! collections déclarées, chacune contenant des valeurs JSON indexées par clé.
//!
//! ## Architecture
//!
//! ```text
//! tabstore
//!     ├── schema.rs     - Collections déclarées et version du schéma
//!     ├── kv.rs         - Trait KvStore (get / set / delete)
//!     ├── sqlite.rs     - Implémentation durable (SQLite)
//!     ├── memory.rs     - Implémentation mémoire (tests, repli)
//!     └── thumbnail.rs  - Slot rapide pour la vignette courante
//! ```
//!
//! ## Schéma de base de données
//!
//! ```sql
//! CREATE TABLE schema_meta (id INTEGER PRIMARY KEY CHECK (id = 0), version INTEGER NOT NULL);
//! CREATE TABLE {collection} (
//!     key TEXT PRIMARY KEY,
//!     value TEXT NOT NULL,          -- JSON
//!     updated_at TEXT NOT NULL      -- RFC3339
//! );
//! ```
//!
//! Les montées de version sont uniquement additives : une collection n'est
//! jamais supprimée ni renommée.
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use tabstore::{KvStore, SqliteStore, BACKGROUND_SETTINGS, TABULA_SCHEMA};
//!
//! # async fn demo() -> tabstore::Result<()> {
//! let store = SqliteStore::open("tabula.db".as_ref(), &TABULA_SCHEMA)?;
//! store
//!     .set(BACKGROUND_SETTINGS, "settings", &serde_json::json!({"shuffle": true}))
//!     .await?;
//! let value = store.get(BACKGROUND_SETTINGS, "settings").await?;
//! assert!(value.is_some());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod kv;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod thumbnail;

pub use error::{Result, StoreError};
pub use kv::KvStore;
pub use memory::MemoryStore;
pub use schema::{
    Collection, StoreSchema, APP_SETTINGS, BACKGROUND_IMAGES, BACKGROUND_SETTINGS, FEED_CACHE,
    TABULA_SCHEMA,
};
pub use sqlite::SqliteStore;
pub use thumbnail::{FileThumbnailSlot, MemoryThumbnailSlot, ThumbnailSlot};
