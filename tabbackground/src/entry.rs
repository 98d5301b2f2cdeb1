//! Entrées de la médiathèque, identifiants et migration du format persisté

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tabmedia::MediaKind;
use tracing::warn;

/// Clé des entrées dans la collection `background_images`
pub const ENTRIES_KEY: &str = "images";

/// Fonds fournis avec l'application, dans leur ordre d'affichage
pub const DEFAULT_ENTRIES: [(&str, &str); 4] = [
    (
        "default-1",
        "https://images.unsplash.com/photo-1506744038136-46273834b3fb?auto=format&fit=crop&w=1920&q=80",
    ),
    (
        "default-2",
        "https://images.unsplash.com/photo-1470071459604-3b5ec3a7fe05?auto=format&fit=crop&w=1920&q=80",
    ),
    (
        "default-3",
        "https://images.unsplash.com/photo-1501785888041-af3ef285b470?auto=format&fit=crop&w=1920&q=80",
    ),
    (
        "default-4",
        "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?auto=format&fit=crop&w=1920&q=80",
    ),
];

/// Média de fond enregistré.
///
/// `url` est toujours la forme durable (URL distante ou data URI), jamais
/// un handle éphémère.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl MediaEntry {
    pub fn kind(&self) -> MediaKind {
        MediaKind::classify(&self.url)
    }

    pub fn is_video(&self) -> bool {
        self.kind().is_video()
    }
}

pub fn default_entries() -> Vec<MediaEntry> {
    DEFAULT_ENTRIES
        .iter()
        .map(|(id, url)| MediaEntry {
            id: id.to_string(),
            url: url.to_string(),
            thumbnail: None,
        })
        .collect()
}

/// Générateur d'identifiants : horodatage en millisecondes, strictement
/// croissant dans le processus.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prend en compte un identifiant existant pour ne jamais le réémettre
    pub fn observe(&self, id: &str) {
        if let Ok(n) = id.parse::<u64>() {
            self.last.fetch_max(n, Ordering::SeqCst);
        }
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1).to_string()
    }
}

/// Résultat de la lecture des entrées persistées
#[derive(Debug, Default)]
pub struct Migrated {
    pub entries: Vec<MediaEntry>,
    /// Au moins un élément a été converti, réparé ou écarté
    pub repaired: bool,
}

/// Convertit la valeur persistée en entrées valides.
///
/// Formats acceptés :
/// - chaîne seule (anciennes versions) : l'URL, un identifiant est généré ;
/// - objet `{id?, url, thumbnail?}`.
///
/// Les éléments sans URL exploitable sont écartés, les identifiants absents
/// ou en double sont régénérés. Chaque correction est journalisée.
pub fn migrate_entries(raw: &Value, ids: &IdGenerator) -> Migrated {
    let Value::Array(items) = raw else {
        warn!(value_type = json_type(raw), "Persisted entries are not a list, ignoring them");
        return Migrated {
            entries: Vec::new(),
            repaired: true,
        };
    };

    // Amorcer le générateur avant d'en tirer quoi que ce soit
    for item in items {
        if let Some(id) = item.get("id").and_then(Value::as_str) {
            ids.observe(id);
        }
    }

    let mut migrated = Migrated::default();
    let mut seen = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let entry = match item {
            Value::String(url) => {
                migrated.repaired = true;
                non_empty(url).map(|url| MediaEntry {
                    id: ids.next_id(),
                    url: url.to_string(),
                    thumbnail: None,
                })
            }
            Value::Object(map) => {
                let url = map.get("url").and_then(Value::as_str).and_then(non_empty);
                url.map(|url| {
                    let id = match map.get("id") {
                        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
                        Some(Value::Number(n)) => {
                            migrated.repaired = true;
                            n.to_string()
                        }
                        _ => {
                            migrated.repaired = true;
                            ids.next_id()
                        }
                    };
                    let thumbnail = match map.get("thumbnail") {
                        None | Some(Value::Null) => None,
                        Some(Value::String(t)) => non_empty(t).map(str::to_string),
                        Some(_) => {
                            migrated.repaired = true;
                            None
                        }
                    };
                    MediaEntry {
                        id,
                        url: url.to_string(),
                        thumbnail,
                    }
                })
            }
            _ => None,
        };

        let Some(mut entry) = entry else {
            warn!(index, "Dropping persisted entry without a usable url");
            migrated.repaired = true;
            continue;
        };

        if !seen.insert(entry.id.clone()) {
            let id = ids.next_id();
            warn!(index, duplicate = %entry.id, id = %id, "Regenerating duplicate entry id");
            entry.id = id;
            seen.insert(entry.id.clone());
            migrated.repaired = true;
        }
        migrated.entries.push(entry);
    }

    migrated
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let a: u64 = ids.next_id().parse().unwrap();
        let b: u64 = ids.next_id().parse().unwrap();
        let c: u64 = ids.next_id().parse().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_ids_skip_observed() {
        let ids = IdGenerator::new();
        let future = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap() + 1_000_000;
        ids.observe(&future.to_string());
        ids.observe("default-1");
        assert_eq!(ids.next_id(), (future + 1).to_string());
    }

    #[test]
    fn test_migrate_current_format() {
        let ids = IdGenerator::new();
        let raw = json!([
            {"id": "1", "url": "https://example.com/a.jpg"},
            {"id": "2", "url": "data:video/mp4;base64,AAAA", "thumbnail": "data:image/jpeg;base64,AAAA"}
        ]);
        let migrated = migrate_entries(&raw, &ids);
        assert!(!migrated.repaired);
        assert_eq!(migrated.entries.len(), 2);
        assert_eq!(
            migrated.entries[1].thumbnail.as_deref(),
            Some("data:image/jpeg;base64,AAAA")
        );
        assert!(migrated.entries[1].is_video());
    }

    #[test]
    fn test_migrate_legacy_strings() {
        let ids = IdGenerator::new();
        let raw = json!(["https://example.com/a.jpg", "https://example.com/b.jpg"]);
        let migrated = migrate_entries(&raw, &ids);
        assert!(migrated.repaired);
        assert_eq!(migrated.entries.len(), 2);
        assert_eq!(migrated.entries[0].url, "https://example.com/a.jpg");
        assert_ne!(migrated.entries[0].id, migrated.entries[1].id);
    }

    #[test]
    fn test_migrate_repairs_and_drops() {
        let ids = IdGenerator::new();
        let raw = json!([
            {"id": "7", "url": "https://example.com/a.jpg"},
            {"id": "7", "url": "https://example.com/b.jpg"},
            {"url": "https://example.com/c.jpg", "thumbnail": 42},
            {"id": "9"},
            {"id": "10", "url": "   "},
            42,
            {"id": 11, "url": "https://example.com/d.jpg"}
        ]);
        let migrated = migrate_entries(&raw, &ids);
        assert!(migrated.repaired);

        let urls: Vec<_> = migrated.entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.jpg",
                "https://example.com/b.jpg",
                "https://example.com/c.jpg",
                "https://example.com/d.jpg"
            ]
        );
        let unique: HashSet<_> = migrated.entries.iter().map(|e| e.id.clone()).collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(migrated.entries[0].id, "7");
        assert_eq!(migrated.entries[3].id, "11");
        assert_eq!(migrated.entries[2].thumbnail, None);
    }

    #[test]
    fn test_migrate_not_a_list() {
        let ids = IdGenerator::new();
        let migrated = migrate_entries(&json!({"images": []}), &ids);
        assert!(migrated.repaired);
        assert!(migrated.entries.is_empty());
    }
}
