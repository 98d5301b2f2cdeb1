//! # tabbackground - Médiathèque et rotation des fonds d'écran
//!
//! La [`BackgroundLibrary`] regroupe les médias enregistrés, la sélection
//! courante et les paramètres de fond. Elle s'appuie sur :
//!
//! - `tabstore` pour la persistance (`background_images` / `images`) et la
//!   vignette d'affichage rapide ;
//! - `tabsettings` pour les [`BackgroundSettings`](tabsettings::BackgroundSettings) ;
//! - `tabmedia` pour résoudre les data URIs en handles éphémères.
//!
//! ## Invariant de sélection
//!
//! `selected_url` est `None` si et seulement si la médiathèque est vide ;
//! sinon elle désigne l'URL durable d'une entrée. Chaque mutation se termine
//! par [`normalize_selection`].
//!
//! ## Rotation
//!
//! [`RotationScheduler::spawn`] démarre la rotation automatique ; voir le
//! module [`scheduler`].
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tabbackground::{BackgroundLibrary, RotationScheduler, RotationUnits};
//! use tabmedia::Resolver;
//! use tabstore::{MemoryStore, MemoryThumbnailSlot, TABULA_SCHEMA};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new(&TABULA_SCHEMA)?);
//! let library = Arc::new(BackgroundLibrary::new(
//!     store,
//!     Arc::new(Resolver::new()),
//!     Arc::new(MemoryThumbnailSlot::new()),
//! ));
//! library.init().await;
//! library.add_image("data:image/png;base64,AAAA", None).await?;
//!
//! let rotation = RotationScheduler::spawn(library.clone(), RotationUnits::default());
//! // ...
//! rotation.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod entry;
pub mod library;
pub mod scheduler;
pub mod selection;

pub use entry::{default_entries, migrate_entries, IdGenerator, MediaEntry, DEFAULT_ENTRIES};
pub use error::{Error, Result};
pub use library::{AxisConditions, BackgroundLibrary, LibrarySnapshot, RotationConditions};
pub use scheduler::{Axis, RotationHandle, RotationScheduler, RotationUnits};
pub use selection::normalize_selection;
