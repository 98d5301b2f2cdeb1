//! Accès HTTP aux fournisseurs de flux

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::{FeedError, Result};
use crate::models::{Coordinates, HolidayCalendar, TrendingArticle, WeatherReport};

/// Timeout par défaut des requêtes HTTP (15 secondes)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// User-Agent par défaut
pub const DEFAULT_USER_AGENT: &str = "Tabula/0.1 (tabfeeds)";

/// Source des données tierces affichées autour du fond
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Météo courante ; avec `None` le fournisseur localise l'appelant
    async fn weather(&self, position: Option<Coordinates>) -> Result<WeatherReport>;

    async fn holidays(&self, year: i32) -> Result<HolidayCalendar>;

    async fn trending(&self) -> Result<Vec<TrendingArticle>>;
}

#[async_trait]
impl<T: FeedFetcher + ?Sized> FeedFetcher for std::sync::Arc<T> {
    async fn weather(&self, position: Option<Coordinates>) -> Result<WeatherReport> {
        (**self).weather(position).await
    }

    async fn holidays(&self, year: i32) -> Result<HolidayCalendar> {
        (**self).holidays(year).await
    }

    async fn trending(&self) -> Result<Vec<TrendingArticle>> {
        (**self).trending().await
    }
}

/// Endpoints des fournisseurs. Un endpoint absent désactive le flux
/// correspondant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEndpoints {
    pub weather: Option<String>,
    pub holidays: Option<String>,
    pub trending: Option<String>,
}

/// [`FeedFetcher`] reposant sur reqwest
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    endpoints: FeedEndpoints,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(endpoints: FeedEndpoints) -> Result<Self> {
        let client = Client::builder().user_agent(DEFAULT_USER_AGENT).build()?;
        Ok(Self::with_client(client, endpoints))
    }

    /// Crée un fetcher avec un reqwest::Client personnalisé
    pub fn with_client(client: Client, endpoints: FeedEndpoints) -> Self {
        Self {
            client,
            endpoints,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        feed: &'static str,
        endpoint: Option<&String>,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = endpoint.ok_or(FeedError::NotConfigured(feed))?;
        debug!(feed, url = %url, "Fetching feed");

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn weather(&self, position: Option<Coordinates>) -> Result<WeatherReport> {
        let query = match position {
            Some(p) => vec![("lat", p.latitude.to_string()), ("lon", p.longitude.to_string())],
            None => Vec::new(),
        };
        self.get_json("weather", self.endpoints.weather.as_ref(), &query)
            .await
    }

    async fn holidays(&self, year: i32) -> Result<HolidayCalendar> {
        self.get_json(
            "holidays",
            self.endpoints.holidays.as_ref(),
            &[("year", year.to_string())],
        )
        .await
    }

    async fn trending(&self) -> Result<Vec<TrendingArticle>> {
        self.get_json("trending", self.endpoints.trending.as_ref(), &[])
            .await
    }
}
