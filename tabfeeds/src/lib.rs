//! # tabfeeds - Flux météo, jours fériés et articles tendance
//!
//! Les widgets autour du fond (horloge et météo, calendrier du mois,
//! articles tendance) s'appuient sur trois fournisseurs tiers. Cette crate
//! définit leurs payloads normalisés, le trait [`FeedFetcher`] avec son
//! implémentation reqwest, et un [`FeedCache`] qui garde les réponses
//! récentes dans la collection `feed_cache` du store.
//!
//! Le cœur de gestion des fonds ne dépend jamais de cette crate.
//!
//! # Exemple
//!
//! ```no_run
//! use std::sync::Arc;
//! use tabfeeds::{FeedCache, FeedEndpoints, HttpFeedFetcher, DEFAULT_TTL};
//! use tabstore::{MemoryStore, TABULA_SCHEMA};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFeedFetcher::new(FeedEndpoints {
//!     holidays: Some("https://example.com/api/holidays".into()),
//!     ..Default::default()
//! })?;
//! let store = Arc::new(MemoryStore::new(&TABULA_SCHEMA)?);
//! let feeds = FeedCache::new(fetcher, store, DEFAULT_TTL);
//!
//! let calendar = feeds.holidays(2025).await?;
//! println!("{} jours fériés", calendar.holidays.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod models;

pub use cache::{FeedCache, DEFAULT_TTL};
pub use error::{FeedError, Result};
pub use fetcher::{FeedEndpoints, FeedFetcher, HttpFeedFetcher};
pub use models::{
    Coordinates, ForecastDay, HolidayCalendar, TrendingArticle, WeatherReport, WeatherWarning,
};
