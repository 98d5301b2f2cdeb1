//! Slot d'accès rapide pour la vignette courante
//!
//! Emplacement unique, synchrone, hors de la base durable. Il permet au
//! prochain démarrage d'afficher un fond plausible avant que la lecture
//! complète du store ne soit terminée. Ce n'est qu'une optimisation de
//! latence : son contenu peut être absent ou périmé.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::{Result, StoreError};

pub trait ThumbnailSlot: Send + Sync {
    /// Vignette enregistrée, `None` si le slot est vide ou illisible.
    fn get(&self) -> Option<String>;

    fn set(&self, thumbnail: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Slot stocké dans un fichier unique
#[derive(Debug, Clone)]
pub struct FileThumbnailSlot {
    path: PathBuf,
}

impl FileThumbnailSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ThumbnailSlot for FileThumbnailSlot {
    fn get(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) if !content.is_empty() => Some(content),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read thumbnail slot: {}", e);
                None
            }
        }
    }

    fn set(&self, thumbnail: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Écriture atomique : fichier temporaire puis renommage
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, thumbnail)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Slot en mémoire
#[derive(Debug, Default)]
pub struct MemoryThumbnailSlot {
    value: Mutex<Option<String>>,
}

impl MemoryThumbnailSlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThumbnailSlot for MemoryThumbnailSlot {
    fn get(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }

    fn set(&self, thumbnail: &str) -> Result<()> {
        *self.value.lock().unwrap() = Some(thumbnail.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}
