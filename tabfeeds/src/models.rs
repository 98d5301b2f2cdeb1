//! Payloads normalisés renvoyés par les fournisseurs de flux

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Position géographique transmise au fournisseur météo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Fragment de clé arrondi à ~1 km : des positions voisines partagent
    /// la même entrée de cache
    pub(crate) fn cache_fragment(&self) -> String {
        format!("{:.2},{:.2}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Température courante, `None` si le fournisseur n'a pas de relevé
    pub temperature: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub future_forecast: Vec<ForecastDay>,
    #[serde(default)]
    pub warnings: Vec<WeatherWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: String,
    #[serde(default)]
    pub temperature_min: Option<f64>,
    #[serde(default)]
    pub temperature_max: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherWarning {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Jours fériés d'une année, indexés par `YYYY-MM-DD`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    #[serde(default)]
    pub holidays: BTreeMap<String, String>,
}

impl HolidayCalendar {
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&str> {
        self.holidays
            .get(&date.format("%Y-%m-%d").to_string())
            .map(String::as_str)
    }

    /// Jours fériés du mois donné, par ordre de date
    pub fn in_month(&self, year: i32, month: u32) -> Vec<(NaiveDate, &str)> {
        self.holidays
            .iter()
            .filter_map(|(date, name)| {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                (chrono::Datelike::year(&date) == year && chrono::Datelike::month(&date) == month)
                    .then_some((date, name.as_str()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingArticle {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub created_at: String,
}

impl TrendingArticle {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Selon le fournisseur, l'identifiant est un nombre ou une chaîne
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
