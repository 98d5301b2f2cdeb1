//! Médiathèque des fonds d'écran

use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tabmedia::{is_handle, Resolver};
use tabsettings::{
    BackgroundSettings, BackgroundSettingsPatch, Loaded, PersistedState, Phase, WriteBehind,
};
use tabstore::{KvStore, ThumbnailSlot, BACKGROUND_IMAGES};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::entry::{default_entries, migrate_entries, IdGenerator, MediaEntry, ENTRIES_KEY};
use crate::selection::normalize_selection;
use crate::{Error, Result};

/// Conditions d'un axe de rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisConditions {
    /// Intervalle dans l'unité de l'axe, `None` si la rotation est coupée
    pub interval: Option<u64>,
    /// Nombre d'entrées éligibles
    pub entries: usize,
}

impl AxisConditions {
    /// Période du timer, `None` si l'axe ne doit pas être armé
    pub fn period(&self, unit: Duration) -> Option<Duration> {
        if self.entries < 2 {
            return None;
        }
        let interval = self.interval.filter(|i| *i > 0)?;
        Some(unit.saturating_mul(u32::try_from(interval).unwrap_or(u32::MAX)))
    }
}

/// Tout ce dont dépend l'armement des timers de rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationConditions {
    pub image: AxisConditions,
    pub video: AxisConditions,
}

impl RotationConditions {
    fn compute(entries: &[MediaEntry], settings: &BackgroundSettings) -> Self {
        Self {
            image: AxisConditions {
                interval: settings.image_rotation_interval(),
                entries: entries
                    .iter()
                    .filter(|e| rotates_with_images(e, settings))
                    .count(),
            },
            video: AxisConditions {
                interval: settings.video_rotation_interval(),
                entries: entries.iter().filter(|e| e.is_video()).count(),
            },
        }
    }
}

/// Une vidéo ne tourne avec les images que si l'axe vidéo est coupé
fn rotates_with_images(entry: &MediaEntry, settings: &BackgroundSettings) -> bool {
    !(entry.is_video() && settings.video_rotation_interval().is_some())
}

/// Vue figée de la médiathèque
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySnapshot {
    #[serde(skip)]
    pub phase: Phase,
    pub entries: Vec<MediaEntry>,
    pub selected_url: Option<String>,
    pub display_url: Option<String>,
    pub settings: BackgroundSettings,
}

struct LibraryState {
    phase: Phase,
    entries: Vec<MediaEntry>,
    /// URL durable de l'entrée sélectionnée
    selected_url: Option<String>,
    /// Handle résolu de la sélection, prêt pour le rendu
    display_url: Option<String>,
}

/// Médiathèque : entrées, sélection courante et paramètres de fond.
///
/// Toutes les mutations s'appliquent d'abord en mémoire puis sont écrites
/// dans le store ; un échec d'écriture est journalisé sans annuler la
/// mutation. La sélection est réparée par [`normalize_selection`] à la fin
/// de chaque mutation.
pub struct BackgroundLibrary {
    resolver: Arc<Resolver>,
    thumbnails: Arc<dyn ThumbnailSlot>,
    settings: PersistedState<BackgroundSettings>,
    entries_writer: WriteBehind,
    state: RwLock<LibraryState>,
    ids: IdGenerator,
    selection_seq: AtomicU64,
    conditions: watch::Sender<RotationConditions>,
    selection: watch::Sender<Option<String>>,
}

impl BackgroundLibrary {
    pub fn new(
        store: Arc<dyn KvStore>,
        resolver: Arc<Resolver>,
        thumbnails: Arc<dyn ThumbnailSlot>,
    ) -> Self {
        let (conditions, _) = watch::channel(RotationConditions::default());
        let (selection, _) = watch::channel(None);
        Self {
            resolver,
            thumbnails,
            settings: PersistedState::new(store.clone()),
            entries_writer: WriteBehind::new(store, BACKGROUND_IMAGES, ENTRIES_KEY),
            state: RwLock::new(LibraryState {
                phase: Phase::Uninitialized,
                entries: Vec::new(),
                selected_url: None,
                display_url: None,
            }),
            ids: IdGenerator::new(),
            selection_seq: AtomicU64::new(0),
            conditions,
            selection,
        }
    }

    /// Charge les entrées et les paramètres, puis restaure la sélection.
    ///
    /// 1. pas d'entrées persistées (ou liste vide) : les fonds fournis sont
    ///    enregistrés ;
    /// 2. `selectedImageUrl` désigne une entrée : elle est sélectionnée ;
    /// 3. sinon la première entrée est sélectionnée.
    ///
    /// Aucune erreur n'est remontée : au pire, l'état mémoire repose sur les
    /// valeurs par défaut.
    pub async fn init(&self) {
        self.state.write().unwrap().phase = Phase::Loading;

        // Lecture en échec : le store garde peut-être des paramètres valides,
        // le miroir de sélection reste en mémoire jusqu'à la prochaine mutation
        let mirror_to_store = self.settings.load().await != Loaded::Failed;

        let (loaded, mut needs_write) = match self.entries_writer.read().await {
            Ok(Some(raw)) => {
                let migrated = migrate_entries(&raw, &self.ids);
                (migrated.entries, migrated.repaired)
            }
            Ok(None) => (Vec::new(), true),
            Err(e) => {
                // Ne pas écraser des entrées peut-être encore lisibles plus tard
                warn!("Failed to read background entries, using defaults in memory: {}", e);
                (default_entries(), false)
            }
        };

        let entries = {
            let mut state = self.state.write().unwrap();
            let mut entries = loaded;
            if entries.is_empty() {
                info!("No background entries, seeding defaults");
                entries = default_entries();
                needs_write = true;
            }
            // Entrées ajoutées avant la fin du chargement
            for local in state.entries.drain(..) {
                if !entries.iter().any(|e| e.id == local.id) {
                    entries.push(local);
                    needs_write = true;
                }
            }
            for entry in &entries {
                self.ids.observe(&entry.id);
            }
            state.entries = entries.clone();
            state.phase = Phase::Ready;
            entries
        };

        if needs_write {
            self.persist_entries().await;
        }

        let persisted = self.settings.get().selected_image_url;
        let selected = normalize_selection(&entries, persisted.as_deref());
        if selected != persisted {
            debug!(
                persisted = ?persisted,
                selected = ?selected,
                "Persisted selection missing, selecting first entry"
            );
        }
        info!(entries = entries.len(), "Background library ready");

        self.show(selected, mirror_to_store).await;
        self.publish_conditions();
    }

    pub fn phase(&self) -> Phase {
        self.state.read().unwrap().phase
    }

    pub fn entries(&self) -> Vec<MediaEntry> {
        self.state.read().unwrap().entries.clone()
    }

    pub fn selected_url(&self) -> Option<String> {
        self.state.read().unwrap().selected_url.clone()
    }

    pub fn display_url(&self) -> Option<String> {
        self.state.read().unwrap().display_url.clone()
    }

    pub fn settings(&self) -> BackgroundSettings {
        self.settings.get()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        let settings = self.settings.get();
        let state = self.state.read().unwrap();
        LibrarySnapshot {
            phase: state.phase,
            entries: state.entries.clone(),
            selected_url: state.selected_url.clone(),
            display_url: state.display_url.clone(),
            settings,
        }
    }

    /// Vignette de la dernière sélection, lisible avant [`init`](Self::init)
    pub fn cached_thumbnail(&self) -> Option<String> {
        self.thumbnails.get()
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Suit les conditions d'armement de la rotation
    pub fn subscribe(&self) -> watch::Receiver<RotationConditions> {
        self.conditions.subscribe()
    }

    /// Suit l'URL durable de la sélection courante
    pub fn watch_selection(&self) -> watch::Receiver<Option<String>> {
        self.selection.subscribe()
    }

    /// Ajoute un média. Le payload durable est conservé tel quel ; un handle
    /// éphémère est ramené à son payload d'origine.
    ///
    /// Sélectionne l'entrée si la médiathèque était vide.
    pub async fn add_image(&self, url: &str, thumbnail: Option<&str>) -> Result<MediaEntry> {
        let url = self.durable(url)?.ok_or(Error::EmptyPayload)?;
        let thumbnail = match thumbnail {
            Some(t) => self.durable(t)?,
            None => None,
        };

        let entry = MediaEntry {
            id: self.ids.next_id(),
            url,
            thumbnail,
        };

        let changed = {
            let mut state = self.state.write().unwrap();
            state.entries.push(entry.clone());
            Self::renormalize(&mut state)
        };
        info!(id = %entry.id, kind = entry.kind().as_str(), "Added background entry");

        self.finish_mutation(changed).await;
        Ok(entry)
    }

    /// Retire une entrée. Si c'était la sélection, la première entrée
    /// restante prend le relais. Retourne `false` si l'id est inconnu.
    pub async fn remove_image(&self, id: &str) -> bool {
        let changed = {
            let mut state = self.state.write().unwrap();
            let Some(index) = state.entries.iter().position(|e| e.id == id) else {
                return false;
            };
            state.entries.remove(index);
            Self::renormalize(&mut state)
        };
        info!(id, "Removed background entry");

        self.finish_mutation(changed).await;
        true
    }

    /// Sélectionne l'entrée dont l'URL durable est `url` (un handle émis
    /// par le resolver est accepté). Retourne `false` si aucune ne correspond.
    pub async fn select_image(&self, url: &str) -> bool {
        let url = self.resolver.durable(url);
        let found = self
            .state
            .read()
            .unwrap()
            .entries
            .iter()
            .any(|e| e.url == url);
        if !found {
            warn!(url = %truncate(&url), "Cannot select unknown background entry");
            return false;
        }
        self.show(Some(url), true).await;
        true
    }

    /// Tire une entrée au hasard, la sélection courante comprise.
    ///
    /// Quand l'axe vidéo est actif, les vidéos sont exclues du tirage.
    pub async fn select_random_image(&self) -> Option<MediaEntry> {
        let settings = self.settings.get();
        self.select_random(|e| rotates_with_images(e, &settings)).await
    }

    /// Tire une vidéo au hasard parmi les entrées vidéo.
    pub async fn select_random_video(&self) -> Option<MediaEntry> {
        self.select_random(MediaEntry::is_video).await
    }

    /// Fusion superficielle dans les paramètres, puis sauvegarde.
    pub async fn update_settings(&self, patch: &BackgroundSettingsPatch) -> BackgroundSettings {
        let updated = self.settings.update(|s| patch.apply(s)).await;
        self.publish_conditions();
        updated
    }

    /// Résout d'avance toutes les data URIs de la médiathèque
    pub async fn prewarm(&self) -> usize {
        let urls: Vec<String> = self.entries().into_iter().map(|e| e.url).collect();
        self.resolver.prewarm(&urls).await
    }

    async fn select_random<P>(&self, eligible: P) -> Option<MediaEntry>
    where
        P: Fn(&MediaEntry) -> bool,
    {
        let picked = {
            let state = self.state.read().unwrap();
            let candidates: Vec<&MediaEntry> =
                state.entries.iter().filter(|e| eligible(*e)).collect();
            if candidates.is_empty() {
                return None;
            }
            let index = rand::rng().random_range(0..candidates.len());
            candidates[index].clone()
        };
        debug!(id = %picked.id, "Randomly selected background entry");
        self.show(Some(picked.url.clone()), true).await;
        Some(picked)
    }

    /// Répare la sélection après une modification des entrées. La nouvelle
    /// sélection est posée tout de suite ; retourne `Some` si elle a changé.
    fn renormalize(state: &mut LibraryState) -> Option<Option<String>> {
        let selected = normalize_selection(&state.entries, state.selected_url.as_deref());
        if selected == state.selected_url {
            return None;
        }
        state.selected_url = selected.clone();
        state.display_url = None;
        Some(selected)
    }

    /// Fin commune de add/remove : écriture, conditions, puis affichage de
    /// la sélection réparée si personne ne l'a remplacée entre-temps.
    async fn finish_mutation(&self, changed: Option<Option<String>>) {
        if let Some(selected) = &changed {
            self.publish_selection(selected);
        }
        self.persist_entries().await;
        self.publish_conditions();

        if let Some(selected) = changed {
            if self.selected_url() == selected {
                self.show(selected, true).await;
            } else {
                debug!("Selection changed during write, keeping newer selection");
            }
        }
    }

    /// Applique une sélection : état mémoire, miroir persisté, vignette,
    /// puis résolution du handle d'affichage.
    ///
    /// Avec `mirror_to_store = false`, `selectedImageUrl` n'est mis à jour
    /// qu'en mémoire.
    async fn show(&self, selected: Option<String>, mirror_to_store: bool) {
        let seq = self.selection_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let (selected, thumbnail) = {
            let mut state = self.state.write().unwrap();
            let selected = normalize_selection(&state.entries, selected.as_deref());
            let thumbnail = selected.as_ref().and_then(|url| {
                state
                    .entries
                    .iter()
                    .find(|e| &e.url == url)
                    .and_then(|e| e.thumbnail.clone())
            });
            if state.selected_url != selected {
                state.display_url = None;
            }
            state.selected_url = selected.clone();
            (selected, thumbnail)
        };

        self.publish_selection(&selected);
        self.write_thumbnail(thumbnail.as_deref());

        if self.settings.get().selected_image_url != selected {
            let mirror = selected.clone();
            if mirror_to_store {
                self.settings
                    .update(move |s| s.selected_image_url = mirror)
                    .await;
            } else {
                self.settings.update_local(move |s| s.selected_image_url = mirror);
            }
        }

        let display = match &selected {
            Some(url) => Some(self.resolver.resolve(url).await),
            None => None,
        };

        let mut state = self.state.write().unwrap();
        if self.selection_seq.load(Ordering::SeqCst) != seq || state.selected_url != selected {
            debug!(seq, "Discarding stale selection resolution");
            return;
        }
        state.display_url = display;
    }

    fn write_thumbnail(&self, thumbnail: Option<&str>) {
        let result = match thumbnail {
            Some(t) => self.thumbnails.set(t),
            None => self.thumbnails.clear(),
        };
        if let Err(e) = result {
            warn!("Failed to update cached thumbnail: {}", e);
        }
    }

    async fn persist_entries(&self) {
        // Avant la fin du chargement, init() écrira la liste fusionnée
        if self.phase() != Phase::Ready {
            debug!("Library not loaded yet, deferring entries write");
            return;
        }
        self.entries_writer
            .write_logged(|| serde_json::to_value(&self.state.read().unwrap().entries))
            .await;
    }

    fn publish_selection(&self, selected: &Option<String>) {
        self.selection.send_if_modified(|current| {
            if current == selected {
                false
            } else {
                *current = selected.clone();
                true
            }
        });
    }

    fn publish_conditions(&self) {
        let settings = self.settings.get();
        let conditions = {
            let state = self.state.read().unwrap();
            RotationConditions::compute(&state.entries, &settings)
        };
        self.conditions.send_if_modified(|current| {
            if *current == conditions {
                false
            } else {
                debug!(?conditions, "Rotation conditions changed");
                *current = conditions;
                true
            }
        });
    }

    /// Forme durable d'une URL saisie, `None` si elle est vide
    fn durable(&self, url: &str) -> Result<Option<String>> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }
        let durable = self.resolver.durable(url);
        if is_handle(&durable) {
            return Err(Error::UnknownHandle(durable));
        }
        Ok(Some(durable))
    }
}

/// Les data URIs peuvent peser plusieurs Mo : on n'en journalise que le début
fn truncate(url: &str) -> &str {
    match url.char_indices().nth(64) {
        Some((end, _)) => &url[..end],
        None => url,
    }
}
