use crate::entry::MediaEntry;

/// Répare la sélection après une mutation.
///
/// Retourne `selected` s'il désigne encore une entrée, sinon l'URL de la
/// première entrée, ou `None` si la médiathèque est vide.
pub fn normalize_selection(entries: &[MediaEntry], selected: Option<&str>) -> Option<String> {
    if let Some(url) = selected {
        if entries.iter().any(|e| e.url == url) {
            return Some(url.to_string());
        }
    }
    entries.first().map(|e| e.url.clone())
}
