use crate::data_uri::{mime_for_extension, DataUri};

/// Nature d'un média de fond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Devine la nature d'un payload durable.
    ///
    /// Une data URI est classée par son type MIME, une URL par l'extension
    /// de son chemin. Tout ce qui n'est pas reconnu comme vidéo est une image.
    pub fn classify(payload: &str) -> Self {
        if DataUri::is_data_uri(payload) {
            return match DataUri::parse(payload) {
                Ok(uri) if uri.mime.starts_with("video/") => MediaKind::Video,
                _ => MediaKind::Image,
            };
        }
        classify_extension(payload).unwrap_or(MediaKind::Image)
    }

    /// Classe d'après un type MIME
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

fn classify_extension(url: &str) -> Option<MediaKind> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    MediaKind::from_mime(mime_for_extension(&ext.to_ascii_lowercase())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_data_uri() {
        assert_eq!(MediaKind::classify("data:video/mp4;base64,AAAA"), MediaKind::Video);
        assert_eq!(MediaKind::classify("data:image/png;base64,AAAA"), MediaKind::Image);
        assert_eq!(MediaKind::classify("data:broken"), MediaKind::Image);
    }

    #[test]
    fn test_classify_url() {
        assert_eq!(
            MediaKind::classify("https://cdn.example.com/loop.WEBM?token=1"),
            MediaKind::Video
        );
        assert_eq!(
            MediaKind::classify("https://images.example.com/photo-123?w=1920"),
            MediaKind::Image
        );
        assert_eq!(MediaKind::classify("https://example.com/a.mp4#t=3"), MediaKind::Video);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(MediaKind::from_mime("Video/WebM"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("text/plain"), None);
    }
}
