//! Cache à durée de vie des réponses des flux, persisté dans la collection
//! `feed_cache`
//!
//! Chaque entrée est stockée sous la forme
//! `{"fetchedAt": <RFC 3339>, "data": <payload>}`.
//! Une entrée plus jeune que le TTL est servie sans contacter le fournisseur.
//! Si le rafraîchissement échoue, la dernière valeur connue est servie même
//! périmée.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tabstore::{KvStore, FEED_CACHE};
use tracing::{debug, warn};

use crate::error::Result;
use crate::fetcher::FeedFetcher;
use crate::models::{Coordinates, HolidayCalendar, TrendingArticle, WeatherReport};

/// Fenêtre de fraîcheur par défaut (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedFeed<T> {
    fetched_at: DateTime<Utc>,
    data: T,
}

pub struct FeedCache<F> {
    fetcher: F,
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl<F: FeedFetcher> FeedCache<F> {
    pub fn new(fetcher: F, store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self {
            fetcher,
            store,
            ttl,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn weather(&self, position: Option<Coordinates>) -> Result<WeatherReport> {
        let key = match position {
            Some(p) => format!("weather:{}", p.cache_fragment()),
            None => "weather:auto".to_string(),
        };
        self.cached(&key, || self.fetcher.weather(position)).await
    }

    pub async fn holidays(&self, year: i32) -> Result<HolidayCalendar> {
        let key = format!("holidays:{}", year);
        self.cached(&key, || self.fetcher.holidays(year)).await
    }

    pub async fn trending(&self) -> Result<Vec<TrendingArticle>> {
        self.cached("trending", || self.fetcher.trending()).await
    }

    /// Oublie une entrée : le prochain appel interroge le fournisseur
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        Ok(self.store.delete(FEED_CACHE, key).await?)
    }

    /// Oublie toutes les entrées. Retourne le nombre d'entrées supprimées.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.store.keys(FEED_CACHE).await? {
            if self.store.delete(FEED_CACHE, &key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn cached<T, Fut>(&self, key: &str, fetch: impl FnOnce() -> Fut) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T>>,
    {
        let stale = match self.read::<T>(key).await {
            Some(entry) if self.is_fresh(entry.fetched_at) => {
                debug!(key, "Feed cache hit");
                return Ok(entry.data);
            }
            other => other,
        };

        match fetch().await {
            Ok(data) => {
                self.write(key, &data).await;
                Ok(data)
            }
            Err(e) => match stale {
                Some(entry) => {
                    warn!(
                        key,
                        fetched_at = %entry.fetched_at,
                        "Feed refresh failed, serving stale value: {}",
                        e
                    );
                    Ok(entry.data)
                }
                None => Err(e),
            },
        }
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        // Horodatage dans le futur : âge nul
        let age = Utc::now()
            .signed_duration_since(fetched_at)
            .to_std()
            .unwrap_or_default();
        age < self.ttl
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CachedFeed<T>> {
        match self.store.get(FEED_CACHE, key).await {
            Ok(Some(raw)) => match serde_json::from_value(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(key, "Ignoring malformed feed cache entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, "Failed to read feed cache: {}", e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, data: &T) {
        let value = json!({
            "fetchedAt": Utc::now(),
            "data": data,
        });
        if let Err(e) = self.store.set(FEED_CACHE, key, &value).await {
            warn!(key, "Failed to store feed cache entry: {}", e);
        }
    }
}
