//! # tabmedia - Résolution des médias de fond pour Tabula
//!
//! Les médias sont persistés sous forme de *payload durable* : soit une URL
//! distante, soit une data URI qui embarque le fichier complet et son type
//! MIME. Réafficher une data URI de plusieurs centaines de Mo à chaque rendu
//! coûte cher ; le [`Resolver`] la décode une seule fois par session et la
//! remplace par un *handle éphémère* (`blob:tabula/<uuid>`) adossé aux
//! octets décodés.
//!
//! ```text
//! payload durable ──resolve()──────────> handle éphémère
//!        ^                                     │
//!        └──────────reverse_resolve()──────────┘
//! ```
//!
//! Le handle n'est jamais persisté : il n'a de sens que pour le processus
//! courant. Toute erreur de décodage renvoie le payload d'origine, le rendu
//! dispose ainsi toujours de quelque chose à afficher.
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use tabmedia::Resolver;
//!
//! # async fn demo() {
//! let resolver = Resolver::new();
//! let handle = resolver.resolve("data:image/png;base64,AAAA").await;
//! assert!(handle.starts_with("blob:"));
//! assert_eq!(
//!     resolver.reverse_resolve(&handle).as_deref(),
//!     Some("data:image/png;base64,AAAA")
//! );
//! # }
//! ```

mod error;
pub mod data_uri;
pub mod fetch;
pub mod kind;
pub mod resolver;

pub use data_uri::{encode_data_uri, mime_for_path, DataUri};
pub use error::{MediaError, Result};
pub use fetch::{InlineFetcher, PayloadFetcher};
pub use kind::MediaKind;
pub use resolver::{is_handle, Blob, Resolver, HANDLE_PREFIX};
