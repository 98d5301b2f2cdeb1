//! # tabconfig - Configuration hôte de Tabula
//!
//! La configuration est un arbre YAML :
//! - valeurs par défaut embarquées (`tabula.yaml`) ;
//! - fusionnées avec `<répertoire>/config.yaml` s'il existe ;
//! - surchargées par les variables `TABULA_CONFIG__SECTION__CLE=valeur` ;
//! - réécrites sur disque après fusion.
//!
//! Les crates bibliothèques (`tabstore`, `tabbackground`, ...) ne lisent
//! jamais cette configuration : l'hôte y prend les valeurs utiles et les
//! leur transmet.
//!
//! ## Utilisation
//!
//! ```no_run
//! use tabconfig::get_config;
//!
//! let config = get_config();
//! let db_path = config.get_store_path()?;
//! let unit = config.get_image_unit_secs()?;
//! config.set_feed_ttl_secs(600)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod tree;

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = include_str!("tabula.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load Tabula configuration"));
}

const ENV_CONFIG_DIR: &str = "TABULA_CONFIG";
const ENV_PREFIX: &str = "TABULA_CONFIG__";
const CONFIG_DIR_NAME: &str = ".tabula";
const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STORE_FILE: &str = "tabula.db";
const DEFAULT_THUMBNAIL_SLOT: &str = "current_thumbnail";
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_IMAGE_UNIT_SECS: u64 = 60;
const DEFAULT_VIDEO_UNIT_SECS: u64 = 3600;
const DEFAULT_FEED_TTL_SECS: u64 = 1800;

/// Type scalaire stockable dans la configuration
pub trait ConfigScalar: Sized {
    /// `None` si le nœud n'a pas le bon type
    fn from_yaml(value: &Value) -> Option<Self>;

    fn into_yaml(self) -> Value;
}

impl ConfigScalar for u64 {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_u64()
    }

    fn into_yaml(self) -> Value {
        Value::Number(Number::from(self))
    }
}

impl ConfigScalar for bool {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_yaml(self) -> Value {
        Value::Bool(self)
    }
}

/// Une chaîne vide vaut absence de valeur
impl ConfigScalar for String {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
    }

    fn into_yaml(self) -> Value {
        Value::String(self)
    }
}

/// Génère une paire getter/setter typée, avec valeur par défaut
macro_rules! config_accessors {
    ($($getter:ident, $setter:ident: $ty:ty = [$($seg:literal),+] or $default:expr;)+) => {
        $(
            pub fn $getter(&self) -> Result<$ty> {
                Ok(self
                    .scalar::<$ty>(&[$($seg),+])
                    .unwrap_or_else(|| <$ty>::from($default)))
            }

            pub fn $setter(&self, value: $ty) -> Result<()> {
                self.set_value(&[$($seg),+], value.into_yaml())
            }
        )+
    };
}

/// Configuration de l'hôte Tabula, adossée à `config.yaml`
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Ordre de recherche : argument explicite, `TABULA_CONFIG`,
    /// `./.tabula`, `~/.tabula`, puis `./.tabula` par défaut.
    fn locate_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory taken from env");
            return PathBuf::from(from_env);
        }

        let local = PathBuf::from(CONFIG_DIR_NAME);
        let home = home_dir().map(|h| h.join(CONFIG_DIR_NAME));
        [Some(local.clone()), home]
            .into_iter()
            .flatten()
            .find(|candidate| candidate.is_dir())
            .unwrap_or(local)
    }

    /// Crée le répertoire au besoin et vérifie qu'il est inscriptible
    fn prepare_dir(path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(anyhow!("Config path {} is not a directory", path.display()));
        }

        let marker = path.join(".write_test");
        fs::write(&marker, b"tabula")?;
        fs::remove_file(&marker)?;
        Ok(())
    }

    /// Résout et prépare le répertoire de configuration
    pub fn config_dir(directory: &str) -> Result<PathBuf> {
        let dir = Self::locate_dir(directory);
        Self::prepare_dir(&dir)?;
        Ok(dir)
    }

    /// Charge la configuration depuis `directory` (vide : recherche
    /// automatique) avec les surcharges de l'environnement du processus.
    pub fn load_config(directory: &str) -> Result<Self> {
        Self::load_config_with_env(directory, env::vars())
    }

    /// Comme [`Config::load_config`] avec un jeu de variables explicite
    pub fn load_config_with_env<I>(directory: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let dir = Self::config_dir(directory)?;
        let file = dir.join(CONFIG_FILE_NAME);
        info!(config_dir = %dir.display(), "Using config directory");

        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read_to_string(&file) {
            Ok(text) => {
                info!(config_file = %file.display(), "Loaded config file");
                let external: Value = serde_yaml::from_str(&text)?;
                tree::merge(&mut data, tree::lowercase_keys(external));
            }
            Err(_) => {
                info!(config_file = %file.display(), "No config file, using embedded defaults");
            }
        }
        let mut data = tree::lowercase_keys(data);

        for (name, raw) in vars {
            let Some(section) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path: Vec<&str> = section.split("__").collect();
            if let Err(e) = tree::insert(&mut data, &path, tree::parse_scalar(&raw)) {
                warn!(env_var = %name, "Ignoring config override: {}", e);
            }
        }

        let config = Config {
            dir,
            file,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Réécrit `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock().unwrap())?;
        fs::write(&self.file, yaml)?;
        Ok(())
    }

    /// Répertoire contenant `config.yaml`
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Écrit une valeur (ex: `&["store", "file"]`) puis sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        tree::insert(&mut self.data.lock().unwrap(), path, value)?;
        self.save()
    }

    /// Lit une valeur ; erreur si le chemin n'existe pas
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        tree::lookup(&data, path).cloned()
    }

    fn scalar<T: ConfigScalar>(&self, path: &[&str]) -> Option<T> {
        let data = self.data.lock().unwrap();
        tree::lookup(&data, path).ok().and_then(T::from_yaml)
    }

    /// Répertoire géré par la configuration, absolu ou relatif au
    /// répertoire de configuration. Il est créé au besoin et la valeur par
    /// défaut est enregistrée si rien n'est configuré.
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let configured = match self.scalar::<String>(path) {
            Some(dir) => dir,
            None => {
                self.set_value(path, Value::String(default.to_string()))?;
                default.to_string()
            }
        };

        let resolved = if Path::new(&configured).is_absolute() {
            PathBuf::from(&configured)
        } else {
            self.dir.join(&configured)
        };

        if !resolved.exists() {
            fs::create_dir_all(&resolved)?;
            info!(directory = %resolved.display(), "Created data directory");
        }
        Ok(resolved)
    }

    /// Répertoire de données (base SQLite, slot de vignette)
    pub fn get_data_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&["host", "data_dir"], DEFAULT_DATA_DIR)
    }

    pub fn get_store_path(&self) -> Result<PathBuf> {
        Ok(self.get_data_dir()?.join(self.get_store_file()?))
    }

    pub fn get_thumbnail_slot_path(&self) -> Result<PathBuf> {
        Ok(self.get_data_dir()?.join(self.get_thumbnail_slot_file()?))
    }

    config_accessors! {
        get_store_file, set_store_file: String = ["store", "file"] or DEFAULT_STORE_FILE;
        get_thumbnail_slot_file, set_thumbnail_slot_file: String = ["store", "thumbnail_slot"] or DEFAULT_THUMBNAIL_SLOT;
        get_log_min_level, set_log_min_level: String = ["host", "logger", "min_level"] or DEFAULT_LOG_MIN_LEVEL;
        get_log_enable_console, set_log_enable_console: bool = ["host", "logger", "enable_console"] or DEFAULT_LOG_ENABLE_CONSOLE;
        get_image_unit_secs, set_image_unit_secs: u64 = ["rotation", "image_unit_secs"] or DEFAULT_IMAGE_UNIT_SECS;
        get_video_unit_secs, set_video_unit_secs: u64 = ["rotation", "video_unit_secs"] or DEFAULT_VIDEO_UNIT_SECS;
        get_feed_ttl_secs, set_feed_ttl_secs: u64 = ["feeds", "ttl_secs"] or DEFAULT_FEED_TTL_SECS;
    }

    /// Endpoint d'un flux (`weather`, `holidays`, `trending`), `None` si
    /// absent ou vide
    pub fn get_feed_url(&self, feed: &str) -> Option<String> {
        let key = format!("{}_url", feed);
        self.scalar::<String>(&["feeds", key.as_str()])
            .filter(|url| !url.trim().is_empty())
    }

    pub fn set_feed_url(&self, feed: &str, url: String) -> Result<()> {
        let key = format!("{}_url", feed);
        self.set_value(&["feeds", key.as_str()], Value::String(url))
    }
}

/// Instance globale, chargée au premier accès
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}
