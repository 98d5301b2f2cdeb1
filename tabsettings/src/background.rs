//! Paramètres des fonds d'écran

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabstore::{Collection, BACKGROUND_SETTINGS};

use crate::fields::{bool_field, int_field, opt_bool_field, opt_int_field, opt_string_field};
use crate::persisted::{as_object, Persisted};

/// Intervalle de rotation par défaut (minutes)
pub const DEFAULT_CHANGE_INTERVAL: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundSettings {
    /// Interrupteur général de la rotation automatique
    pub change_by_time: bool,
    /// Tirage aléatoire uniforme (la sélection courante peut être retirée)
    pub shuffle: bool,
    /// Minutes entre deux rotations ; une valeur ≤ 0 désactive la rotation
    pub change_interval: i64,
    /// Calque d'assombrissement au-dessus du média
    pub show_overlay: bool,
    /// Miroir persisté de la sélection courante (URL durable)
    pub selected_image_url: Option<String>,
    /// Rotation des vidéos : tirage aléatoire parmi les vidéos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_shuffle: Option<bool>,
    /// Rotation des vidéos : intervalle en heures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_change_interval: Option<i64>,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            change_by_time: false,
            shuffle: false,
            change_interval: DEFAULT_CHANGE_INTERVAL,
            show_overlay: true,
            selected_image_url: None,
            video_shuffle: None,
            video_change_interval: None,
        }
    }
}

impl BackgroundSettings {
    /// Intervalle de rotation des images en minutes, `None` si désactivée.
    ///
    /// Ne tient pas compte du nombre d'entrées.
    pub fn image_rotation_interval(&self) -> Option<u64> {
        if self.change_by_time && self.shuffle && self.change_interval > 0 {
            Some(self.change_interval as u64)
        } else {
            None
        }
    }

    /// Intervalle de rotation des vidéos en heures, `None` si désactivée.
    pub fn video_rotation_interval(&self) -> Option<u64> {
        match (self.video_shuffle, self.video_change_interval) {
            (Some(true), Some(hours)) if hours > 0 => Some(hours as u64),
            _ => None,
        }
    }
}

impl Persisted for BackgroundSettings {
    const COLLECTION: Collection = BACKGROUND_SETTINGS;
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
            change_by_time: bool_field(raw, "changeByTime", defaults.change_by_time),
            shuffle: bool_field(raw, "shuffle", defaults.shuffle),
            change_interval: int_field(raw, "changeInterval", defaults.change_interval),
            show_overlay: bool_field(raw, "showOverlay", defaults.show_overlay),
            selected_image_url: opt_string_field(
                raw,
                "selectedImageUrl",
                defaults.selected_image_url,
            ),
            video_shuffle: opt_bool_field(raw, "videoShuffle", defaults.video_shuffle),
            video_change_interval: opt_int_field(
                raw,
                "videoChangeInterval",
                defaults.video_change_interval,
            ),
        }
    }
}

/// Mise à jour partielle des paramètres de fond.
///
/// `selectedImageUrl` n'en fait pas partie : il suit la sélection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundSettingsPatch {
    pub change_by_time: Option<bool>,
    pub shuffle: Option<bool>,
    pub change_interval: Option<i64>,
    pub show_overlay: Option<bool>,
    pub video_shuffle: Option<bool>,
    pub video_change_interval: Option<i64>,
}

impl BackgroundSettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fusion superficielle dans `settings`
    pub fn apply(&self, settings: &mut BackgroundSettings) {
        if let Some(v) = self.change_by_time {
            settings.change_by_time = v;
        }
        if let Some(v) = self.shuffle {
            settings.shuffle = v;
        }
        if let Some(v) = self.change_interval {
            settings.change_interval = v;
        }
        if let Some(v) = self.show_overlay {
            settings.show_overlay = v;
        }
        if let Some(v) = self.video_shuffle {
            settings.video_shuffle = Some(v);
        }
        if let Some(v) = self.video_change_interval {
            settings.video_change_interval = Some(v);
        }
    }
}
