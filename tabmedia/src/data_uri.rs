//! Data URIs : `data:[<mime>][;param]*[;base64],<data>`

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use std::path::Path;

use crate::{MediaError, Result};

const DATA_PREFIX: &str = "data:";
const DEFAULT_MIME: &str = "text/plain";

/// Décodeur tolérant au padding manquant ou superflu
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Data URI découpée, sans copie des données
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// Type MIME déclaré, en minuscules
    pub mime: String,
    /// Marqueur `;base64` présent
    pub base64: bool,
    /// Données brutes après la virgule
    pub data: &'a str,
}

impl<'a> DataUri<'a> {
    pub fn is_data_uri(s: &str) -> bool {
        s.len() >= DATA_PREFIX.len() && s[..DATA_PREFIX.len()].eq_ignore_ascii_case(DATA_PREFIX)
    }

    pub fn parse(s: &'a str) -> Result<Self> {
        if !Self::is_data_uri(s) {
            return Err(MediaError::NotDataUri);
        }
        let rest = &s[DATA_PREFIX.len()..];
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| MediaError::MalformedDataUri("missing ',' separator".to_string()))?;

        let mut parts = header.split(';');
        let mime = parts.next().unwrap_or_default().trim();
        let mime = if mime.is_empty() {
            DEFAULT_MIME.to_string()
        } else if mime.contains('/') {
            mime.to_ascii_lowercase()
        } else {
            return Err(MediaError::MalformedDataUri(format!(
                "invalid media type '{}'",
                mime
            )));
        };

        let base64 = parts
            .map(str::trim)
            .any(|p| p.eq_ignore_ascii_case("base64"));

        Ok(Self { mime, base64, data })
    }

    /// Décode la partie base64. Les blancs sont ignorés.
    pub fn decode_base64(&self) -> Result<Vec<u8>> {
        if !self.base64 {
            return Err(MediaError::MalformedDataUri("not base64-encoded".to_string()));
        }
        if self.data.bytes().any(|b| b.is_ascii_whitespace()) {
            let compact: String = self.data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            Ok(LENIENT.decode(compact)?)
        } else {
            Ok(LENIENT.decode(self.data)?)
        }
    }
}

/// Construit une data URI base64 à partir d'octets bruts
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("{}{};base64,{}", DATA_PREFIX, mime, encoded)
}

/// Type MIME d'un fichier image ou vidéo d'après son extension.
///
/// Retourne `None` pour les extensions non reconnues.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    mime_for_extension(&ext)
}

pub(crate) fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        // Vidéos
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => return None,
    };
    Some(mime)
}
