mod commands;
mod logs;

use std::sync::Arc;

use clap::Parser;
use tabbackground::BackgroundLibrary;
use tabconfig::{get_config, Config};
use tabmedia::Resolver;
use tabstore::{FileThumbnailSlot, KvStore, MemoryStore, SqliteStore, TABULA_SCHEMA};
use tracing::{info, warn};

use crate::commands::{Cli, Command};

/// Ouvre le store durable ; en cas d'échec les changements ne vivront qu'en
/// mémoire pour cette exécution.
fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    let path = config.get_store_path()?;
    match SqliteStore::open(&path, &TABULA_SCHEMA) {
        Ok(store) => {
            info!(path = %path.display(), "💾 Store opened");
            Ok(Arc::new(store))
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                "⚠️ Durable store unavailable, changes will be applied in memory only: {}",
                e
            );
            Ok(Arc::new(MemoryStore::new(&TABULA_SCHEMA)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ========== PHASE 1 : Configuration et logs ==========
    let config = match &cli.config {
        Some(dir) => Arc::new(Config::load_config(dir)?),
        None => get_config(),
    };
    logs::init_logging(&config);
    info!(dir = %config.dir().display(), "⚙️ Configuration loaded");

    // ========== PHASE 2 : Stockage et médiathèque ==========
    let store = open_store(&config)?;
    let thumbnails = Arc::new(FileThumbnailSlot::new(config.get_thumbnail_slot_path()?));
    let library = Arc::new(BackgroundLibrary::new(
        store.clone(),
        Arc::new(Resolver::new()),
        thumbnails,
    ));

    if !matches!(cli.command, Command::App(_) | Command::Feeds(_)) {
        library.init().await;
        info!(
            entries = library.entries().len(),
            "🖼️ Background library ready"
        );
    }

    // ========== PHASE 3 : Commande ==========
    match cli.command {
        Command::List => commands::list(&library),
        Command::Add { source, thumbnail } => {
            commands::add(&library, &source, thumbnail.as_deref()).await?
        }
        Command::Remove { id } => commands::remove(&library, &id).await,
        Command::Select { url } => commands::select(&library, &url).await,
        Command::Random { video } => commands::random(&library, video).await,
        Command::Settings(args) => commands::settings(&library, &args).await?,
        Command::App(args) => commands::app(store, &args).await?,
        Command::Feeds(args) => commands::feeds(&config, store, &args).await?,
        Command::Run => commands::run(&config, library).await?,
    }

    Ok(())
}
