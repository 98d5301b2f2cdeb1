//! Commandes de la ligne de commande `tabula`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand};
use tabbackground::{Axis, BackgroundLibrary, RotationScheduler, RotationUnits};
use tabconfig::Config;
use tabfeeds::{Coordinates, FeedCache, FeedEndpoints, HttpFeedFetcher};
use tabmedia::{encode_data_uri, mime_for_path};
use tabsettings::{AppSettings, AppSettingsPatch, BackgroundSettingsPatch, PersistedState, SearchEngine};
use tabstore::KvStore;
use tokio::signal;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "tabula", version, about = "Background library and settings of the Tabula new-tab page")]
pub struct Cli {
    /// Configuration directory
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the background entries
    List,
    /// Add a local media file or a URL
    Add {
        source: String,
        /// Small preview image painted before the full media is ready
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },
    /// Remove an entry by id
    Remove { id: String },
    /// Select an entry by URL
    Select { url: String },
    /// Pick a random entry
    Random {
        /// Pick among video entries only
        #[arg(long)]
        video: bool,
    },
    /// Show or update the background settings
    Settings(SettingsArgs),
    /// Show or update the display settings
    App(AppArgs),
    /// Show weather, holidays and trending articles
    Feeds(FeedsArgs),
    /// Keep the rotation running until Ctrl+C
    Run,
}

#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    #[arg(long)]
    pub change_by_time: Option<bool>,
    #[arg(long)]
    pub shuffle: Option<bool>,
    /// Rotation interval in minutes
    #[arg(long)]
    pub interval: Option<i64>,
    #[arg(long)]
    pub overlay: Option<bool>,
    #[arg(long)]
    pub video_shuffle: Option<bool>,
    /// Video rotation interval in hours
    #[arg(long)]
    pub video_interval: Option<i64>,
}

impl SettingsArgs {
    fn patch(&self) -> BackgroundSettingsPatch {
        BackgroundSettingsPatch {
            change_by_time: self.change_by_time,
            shuffle: self.shuffle,
            change_interval: self.interval,
            show_overlay: self.overlay,
            video_shuffle: self.video_shuffle,
            video_change_interval: self.video_interval,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct AppArgs {
    #[arg(long)]
    pub weather: Option<bool>,
    #[arg(long)]
    pub calendar: Option<bool>,
    #[arg(long)]
    pub trending: Option<bool>,
    #[arg(long)]
    pub analog_clock: Option<bool>,
    #[arg(long)]
    pub weather_location: Option<bool>,
    /// google, bing, duckduckgo, brave or ecosia
    #[arg(long)]
    pub search_engine: Option<SearchEngine>,
}

impl AppArgs {
    fn patch(&self) -> AppSettingsPatch {
        AppSettingsPatch {
            show_weather: self.weather,
            show_calendar: self.calendar,
            show_trending: self.trending,
            analog_clock: self.analog_clock,
            show_weather_location: self.weather_location,
            search_engine: self.search_engine,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FeedsArgs {
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
    /// Drop cached responses first
    #[arg(long)]
    pub refresh: bool,
}

/// Transforme un fichier local en data URI ; toute autre valeur est
/// conservée telle quelle.
async fn payload_from(source: &str) -> anyhow::Result<String> {
    let path = Path::new(source);
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(source.to_string());
    }

    let mime = mime_for_path(path).ok_or_else(|| anyhow!("Unsupported media file: {}", source))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", source))?;
    debug!(mime, size = bytes.len(), "Encoding local file");
    Ok(encode_data_uri(mime, &bytes))
}

fn short(url: &str) -> String {
    if url.len() <= 72 {
        return url.to_string();
    }
    let cut = (0..=72).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
    format!("{}…", &url[..cut])
}

pub fn list(library: &BackgroundLibrary) {
    let selected = library.selected_url();
    for entry in library.entries() {
        let marker = if selected.as_deref() == Some(entry.url.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<16} {:<5} {}",
            marker,
            entry.id,
            entry.kind().as_str(),
            short(&entry.url)
        );
    }
}

pub async fn add(
    library: &BackgroundLibrary,
    source: &str,
    thumbnail: Option<&Path>,
) -> anyhow::Result<()> {
    let payload = payload_from(source).await?;
    let thumbnail = match thumbnail {
        Some(path) => Some(payload_from(&path.to_string_lossy()).await?),
        None => None,
    };

    let entry = library.add_image(&payload, thumbnail.as_deref()).await?;
    info!(id = %entry.id, kind = entry.kind().as_str(), "✅ Entry added");
    println!("{}", entry.id);
    Ok(())
}

pub async fn remove(library: &BackgroundLibrary, id: &str) {
    if library.remove_image(id).await {
        info!(id, "🗑️ Entry removed");
    } else {
        warn!(id, "⚠️ No entry with this id");
    }
}

pub async fn select(library: &BackgroundLibrary, url: &str) {
    if library.select_image(url).await {
        info!(url = %short(url), "✅ Entry selected");
    } else {
        warn!(url = %short(url), "⚠️ No entry with this URL");
    }
}

pub async fn random(library: &BackgroundLibrary, video: bool) {
    let picked = if video {
        library.select_random_video().await
    } else {
        library.select_random_image().await
    };
    match picked {
        Some(entry) => println!("{}", entry.id),
        None => warn!(video, "⚠️ Nothing to pick from"),
    }
}

pub async fn settings(library: &BackgroundLibrary, args: &SettingsArgs) -> anyhow::Result<()> {
    let patch = args.patch();
    let settings = if patch.is_empty() {
        library.settings()
    } else {
        library.update_settings(&patch).await
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn app(store: Arc<dyn KvStore>, args: &AppArgs) -> anyhow::Result<()> {
    let state = PersistedState::<AppSettings>::new(store);
    state.load().await;

    let patch = args.patch();
    let settings = if patch.is_empty() {
        state.get()
    } else {
        state.update(|s| patch.apply(s)).await
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn feeds(config: &Config, store: Arc<dyn KvStore>, args: &FeedsArgs) -> anyhow::Result<()> {
    let fetcher = HttpFeedFetcher::new(FeedEndpoints {
        weather: config.get_feed_url("weather"),
        holidays: config.get_feed_url("holidays"),
        trending: config.get_feed_url("trending"),
    })?;
    let ttl = Duration::from_secs(config.get_feed_ttl_secs()?);
    let cache = FeedCache::new(fetcher, store, ttl);

    if args.refresh {
        let removed = cache.clear().await?;
        debug!(removed, "Feed cache cleared");
    }

    let position = args.lat.zip(args.lon).map(|(lat, lon)| Coordinates::new(lat, lon));
    match cache.weather(position).await {
        Ok(report) => {
            let temperature = report
                .temperature
                .map(|t| format!("{:.0}°", t))
                .unwrap_or_else(|| "--".to_string());
            println!("{} {} ({})", temperature, report.description, report.location);
            for warning in &report.warnings {
                match &warning.severity {
                    Some(severity) => println!("  ! [{}] {}", severity, warning.title),
                    None => println!("  ! {}", warning.title),
                }
            }
        }
        Err(e) => warn!("⚠️ Weather unavailable: {}", e),
    }

    let today = Local::now().date_naive();
    match cache.holidays(today.year()).await {
        Ok(calendar) => {
            if let Some(name) = calendar.holiday_on(today) {
                println!("Today: {}", name);
            }
            for (date, name) in calendar.in_month(today.year(), today.month()) {
                println!("  {} {}", date, name);
            }
        }
        Err(e) => warn!("⚠️ Holidays unavailable: {}", e),
    }

    match cache.trending().await {
        Ok(articles) => {
            for article in articles.iter().take(10) {
                println!("- {} [{}]", article.title, article.source);
            }
        }
        Err(e) => warn!("⚠️ Trending articles unavailable: {}", e),
    }

    Ok(())
}

pub async fn run(config: &Config, library: Arc<BackgroundLibrary>) -> anyhow::Result<()> {
    let units = RotationUnits {
        image: Duration::from_secs(config.get_image_unit_secs()?),
        video: Duration::from_secs(config.get_video_unit_secs()?),
    };

    info!("🔄 Starting background rotation...");
    let rotation = RotationScheduler::spawn(library.clone(), units);

    let warm = library.clone();
    tokio::spawn(async move {
        let resolved = warm.prewarm().await;
        debug!(resolved, "Payloads prewarmed");
    });

    let mut conditions = library.subscribe();
    let mut selection = library.watch_selection();

    info!("✅ Tabula is running");
    info!("Press Ctrl+C to stop...");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            changed = conditions.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *conditions.borrow_and_update();
                info!(
                    image_interval = ?current.image.interval,
                    video_interval = ?current.video.interval,
                    image_armed = rotation.is_armed(Axis::Image),
                    video_armed = rotation.is_armed(Axis::Video),
                    "Rotation conditions changed"
                );
            }
            changed = selection.changed() => {
                if changed.is_err() {
                    break;
                }
                let selected = selection.borrow_and_update().clone();
                info!(url = ?selected.as_deref().map(short), "🖼️ Background changed");
            }
        }
    }

    info!("🛑 Stopping rotation...");
    rotation.shutdown().await;
    Ok(())
}
