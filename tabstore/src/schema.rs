//! Collections déclarées et versions du schéma

use crate::{Result, StoreError};

/// Espace de noms déclaré du stockage.
///
/// Le nom sert directement de nom de table SQLite : il est limité à
/// `[a-z0-9_]` et vérifié à l'ouverture du store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Collection(&'static str);

impl Collection {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let valid = !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
            && !self.0.as_bytes()[0].is_ascii_digit()
            && self.0 != "schema_meta";
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidCollectionName(self.0.to_string()))
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Paramètres de l'application
pub const APP_SETTINGS: Collection = Collection::new("app_settings");
/// Bibliothèque des fonds d'écran (clé `images`)
pub const BACKGROUND_IMAGES: Collection = Collection::new("background_images");
/// Paramètres des fonds d'écran (clé `settings`)
pub const BACKGROUND_SETTINGS: Collection = Collection::new("background_settings");
/// Réponses mises en cache des fournisseurs externes
pub const FEED_CACHE: Collection = Collection::new("feed_cache");

/// Version de schéma et collections qu'elle déclare.
///
/// Une nouvelle version ne fait qu'ajouter des collections : celles des
/// versions précédentes doivent rester listées.
#[derive(Debug, Clone, Copy)]
pub struct StoreSchema {
    pub version: u32,
    pub collections: &'static [Collection],
}

impl StoreSchema {
    pub fn declares(&self, collection: Collection) -> bool {
        self.collections.contains(&collection)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.collections.iter().try_for_each(Collection::validate)
    }
}

/// Schéma courant de Tabula.
///
/// v1 : paramètres + bibliothèque, v2 : cache des flux externes.
pub const TABULA_SCHEMA: StoreSchema = StoreSchema {
    version: 2,
    collections: &[APP_SETTINGS, BACKGROUND_IMAGES, BACKGROUND_SETTINGS, FEED_CACHE],
};
