//! Paramètres d'affichage de l'application

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tabstore::{Collection, APP_SETTINGS};

use crate::fields::{bool_field, serde_field};
use crate::persisted::{as_object, Persisted};

/// Moteurs de recherche pris en charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    Bing,
    DuckDuckGo,
    Brave,
    Ecosia,
}

impl SearchEngine {
    pub const ALL: [SearchEngine; 5] = [
        SearchEngine::Google,
        SearchEngine::Bing,
        SearchEngine::DuckDuckGo,
        SearchEngine::Brave,
        SearchEngine::Ecosia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Bing => "bing",
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Brave => "brave",
            SearchEngine::Ecosia => "ecosia",
        }
    }

    fn query_base(&self) -> &'static str {
        match self {
            SearchEngine::Google => "https://www.google.com/search?q=",
            SearchEngine::Bing => "https://www.bing.com/search?q=",
            SearchEngine::DuckDuckGo => "https://duckduckgo.com/?q=",
            SearchEngine::Brave => "https://search.brave.com/search?q=",
            SearchEngine::Ecosia => "https://www.ecosia.org/search?q=",
        }
    }

    /// URL de recherche pour `query`
    pub fn search_url(&self, query: &str) -> String {
        format!("{}{}", self.query_base(), urlencoding::encode(query.trim()))
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SearchEngine::ALL
            .into_iter()
            .find(|engine| engine.as_str() == lower)
            .ok_or_else(|| format!("unsupported search engine: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub show_weather: bool,
    pub show_calendar: bool,
    pub show_trending: bool,
    /// Horloge analogique au lieu de l'horloge numérique
    pub analog_clock: bool,
    /// Nom du lieu sous la météo
    pub show_weather_location: bool,
    pub search_engine: SearchEngine,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            show_weather: true,
            show_calendar: true,
            show_trending: true,
            analog_clock: false,
            show_weather_location: true,
            search_engine: SearchEngine::Google,
        }
    }
}

impl Persisted for AppSettings {
    const COLLECTION: Collection = APP_SETTINGS;
    const KEY: &'static str = "settings";

    fn defaults() -> Self {
        Self::default()
    }

    fn merge_persisted(raw: &Value) -> Self {
        let defaults = Self::default();
        let Some(raw) = as_object(raw, Self::COLLECTION) else {
            return defaults;
        };

        Self {
            show_weather: bool_field(raw, "showWeather", defaults.show_weather),
            show_calendar: bool_field(raw, "showCalendar", defaults.show_calendar),
            show_trending: bool_field(raw, "showTrending", defaults.show_trending),
            analog_clock: bool_field(raw, "analogClock", defaults.analog_clock),
            show_weather_location: bool_field(
                raw,
                "showWeatherLocation",
                defaults.show_weather_location,
            ),
            search_engine: serde_field(raw, "searchEngine", defaults.search_engine),
        }
    }
}

/// Mise à jour partielle des paramètres d'application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettingsPatch {
    pub show_weather: Option<bool>,
    pub show_calendar: Option<bool>,
    pub show_trending: Option<bool>,
    pub analog_clock: Option<bool>,
    pub show_weather_location: Option<bool>,
    pub search_engine: Option<SearchEngine>,
}

impl AppSettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(v) = self.show_weather {
            settings.show_weather = v;
        }
        if let Some(v) = self.show_calendar {
            settings.show_calendar = v;
        }
        if let Some(v) = self.show_trending {
            settings.show_trending = v;
        }
        if let Some(v) = self.analog_clock {
            settings.analog_clock = v;
        }
        if let Some(v) = self.show_weather_location {
            settings.show_weather_location = v;
        }
        if let Some(v) = self.search_engine {
            settings.search_engine = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_engine_parsing() {
        assert_eq!("DuckDuckGo".parse::<SearchEngine>(), Ok(SearchEngine::DuckDuckGo));
        assert_eq!("bing".parse::<SearchEngine>(), Ok(SearchEngine::Bing));
        assert!("altavista".parse::<SearchEngine>().is_err());
        assert_eq!(
            serde_json::to_value(SearchEngine::DuckDuckGo).unwrap(),
            json!("duckduckgo")
        );
    }

    #[test]
    fn test_search_url_encodes_query() {
        assert_eq!(
            SearchEngine::Google.search_url(" rust async "),
            "https://www.google.com/search?q=rust%20async"
        );
        assert_eq!(
            SearchEngine::Ecosia.search_url("a&b"),
            "https://www.ecosia.org/search?q=a%26b"
        );
    }

    #[test]
    fn test_merge_unknown_engine_falls_back() {
        let raw = json!({"searchEngine": "altavista", "showWeather": false});
        let merged = AppSettings::merge_persisted(&raw);
        assert_eq!(merged.search_engine, SearchEngine::Google);
        assert!(!merged.show_weather);
        assert!(merged.show_calendar);
    }

    #[test]
    fn test_patch() {
        let mut settings = AppSettings::default();
        AppSettingsPatch {
            analog_clock: Some(true),
            search_engine: Some(SearchEngine::Brave),
            ..Default::default()
        }
        .apply(&mut settings);
        assert!(settings.analog_clock);
        assert_eq!(settings.search_engine, SearchEngine::Brave);
        assert!(settings.show_trending);
    }
}
