use async_trait::async_trait;
use serde_json::Value;

use crate::{Collection, Result};

/// Stockage clé/valeur structuré, organisé en collections déclarées.
///
/// Chaque couple `(collection, key)` contient une valeur JSON opaque.
/// Toutes les opérations peuvent échouer (base indisponible, verrou tenu par
/// un autre processus, disque plein) : les appelants journalisent l'erreur et
/// poursuivent avec leur état en mémoire.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Lit une valeur, `None` si la clé est absente.
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>>;

    /// Écrit (ou remplace) une valeur.
    async fn set(&self, collection: Collection, key: &str, value: &Value) -> Result<()>;

    /// Supprime une valeur. Retourne `true` si la clé existait.
    async fn delete(&self, collection: Collection, key: &str) -> Result<bool>;

    /// Liste les clés d'une collection, triées.
    async fn keys(&self, collection: Collection) -> Result<Vec<String>>;
}
