//! # tabsettings - Paramètres persistés de Tabula
//!
//! Cette crate fournit le motif « défauts → fusion des valeurs persistées →
//! mutation puis sauvegarde » sous la forme d'une abstraction générique,
//! [`PersistedState`], et les deux agrégats qui l'utilisent :
//!
//! - [`AppSettings`] : visibilité des widgets et moteur de recherche
//! - [`BackgroundSettings`] : rotation et affichage des fonds d'écran
//!
//! ## Cycle de vie
//!
//! ```text
//! UNINITIALIZED ──load()──> LOADING ──> READY
//!       │                                 │
//!       └── valeurs par défaut            └── défauts + champs persistés valides
//! ```
//!
//! La fusion se fait champ par champ : un champ absent ou mal typé dans la
//! valeur persistée retombe sur sa valeur par défaut sans invalider le reste.
//! C'est ce qui permet d'ajouter de nouveaux paramètres d'une version à
//! l'autre.
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tabsettings::{AppSettings, PersistedState, SearchEngine};
//! use tabstore::{MemoryStore, TABULA_SCHEMA};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new(&TABULA_SCHEMA)?);
//! let settings = PersistedState::<AppSettings>::new(store);
//! settings.load().await;
//! settings.update(|s| s.search_engine = SearchEngine::DuckDuckGo).await;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod background;
pub mod fields;
pub mod persisted;

pub use app::{AppSettings, AppSettingsPatch, SearchEngine};
pub use background::{BackgroundSettings, BackgroundSettingsPatch};
pub use persisted::{Loaded, Persisted, PersistedState, Phase, WriteBehind};
