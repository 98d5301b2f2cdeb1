use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tabbackground::{BackgroundLibrary, Error, MediaEntry, DEFAULT_ENTRIES};
use tabmedia::{is_handle, Blob, InlineFetcher, PayloadFetcher, Resolver};
use tabsettings::{BackgroundSettingsPatch, Phase};
use tabstore::{
    Collection, KvStore, MemoryStore, MemoryThumbnailSlot, SqliteStore, StoreError, ThumbnailSlot,
    BACKGROUND_IMAGES, BACKGROUND_SETTINGS, TABULA_SCHEMA,
};

const PNG: &str = "data:image/png;base64,AAAA";
const VIDEO: &str = "data:video/mp4;base64,AAAAAAAA";
const VIDEO_THUMB: &str = "data:image/jpeg;base64,AAAA";

fn create_test_library(store: Arc<dyn KvStore>) -> (BackgroundLibrary, Arc<MemoryThumbnailSlot>) {
    let slot = Arc::new(MemoryThumbnailSlot::new());
    let library = BackgroundLibrary::new(store, Arc::new(Resolver::new()), slot.clone());
    (library, slot)
}

fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(&TABULA_SCHEMA).unwrap())
}

/// Vérifie l'invariant : pas de sélection si et seulement si vide, sinon
/// une URL durable présente dans les entrées.
fn assert_selection_invariant(library: &BackgroundLibrary) {
    let snapshot = library.snapshot();
    match &snapshot.selected_url {
        None => assert!(snapshot.entries.is_empty()),
        Some(url) => {
            let durable = library.resolver().durable(url);
            assert!(
                snapshot.entries.iter().any(|e| e.url == durable),
                "selection {} not in entries",
                durable
            );
        }
    }
}

async fn remove_all(library: &BackgroundLibrary) {
    for entry in library.entries() {
        assert!(library.remove_image(&entry.id).await);
    }
}

/// Store dont les écritures peuvent être coupées, et la prochaine lecture
/// des paramètres de fond mise en échec
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_settings_read: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(&TABULA_SCHEMA).unwrap(),
            fail_writes: AtomicBool::new(false),
            fail_settings_read: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, collection: Collection, key: &str) -> tabstore::Result<Option<Value>> {
        if collection == BACKGROUND_SETTINGS && self.fail_settings_read.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read timed out".into()));
        }
        self.inner.get(collection, key).await
    }

    async fn set(&self, collection: Collection, key: &str, value: &Value) -> tabstore::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("quota exceeded".into()));
        }
        self.inner.set(collection, key, value).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> tabstore::Result<bool> {
        self.inner.delete(collection, key).await
    }

    async fn keys(&self, collection: Collection) -> tabstore::Result<Vec<String>> {
        self.inner.keys(collection).await
    }
}

/// Store dont l'écriture des entrées attend un signal
struct GatedStore {
    inner: MemoryStore,
    hold_entries: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(&TABULA_SCHEMA).unwrap(),
            hold_entries: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl KvStore for GatedStore {
    async fn get(&self, collection: Collection, key: &str) -> tabstore::Result<Option<Value>> {
        self.inner.get(collection, key).await
    }

    async fn set(&self, collection: Collection, key: &str, value: &Value) -> tabstore::Result<()> {
        if collection == BACKGROUND_IMAGES && self.hold_entries.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.set(collection, key, value).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> tabstore::Result<bool> {
        self.inner.delete(collection, key).await
    }

    async fn keys(&self, collection: Collection) -> tabstore::Result<Vec<String>> {
        self.inner.keys(collection).await
    }
}

/// Fetcher qui attend un signal avant de décoder
struct GatedFetcher {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl PayloadFetcher for GatedFetcher {
    async fn fetch(&self, payload: &str) -> tabmedia::Result<Blob> {
        self.entered.notify_one();
        self.release.notified().await;
        InlineFetcher.fetch(payload).await
    }
}

#[tokio::test]
async fn test_first_run_seeds_defaults() {
    let store = memory_store();
    let (library, _) = create_test_library(store.clone());
    assert_eq!(library.phase(), Phase::Uninitialized);

    library.init().await;

    assert_eq!(library.phase(), Phase::Ready);
    let ids: Vec<_> = library.entries().into_iter().map(|e| e.id).collect();
    let expected: Vec<_> = DEFAULT_ENTRIES.iter().map(|(id, _)| id.to_string()).collect();
    assert_eq!(ids, expected);

    let first = DEFAULT_ENTRIES[0].1;
    assert_eq!(library.selected_url().as_deref(), Some(first));
    // URL distante : affichée telle quelle
    assert_eq!(library.display_url().as_deref(), Some(first));

    // Les défauts et la sélection sont persistés
    let persisted = store.get(BACKGROUND_IMAGES, "images").await.unwrap().unwrap();
    assert_eq!(persisted.as_array().unwrap().len(), 4);
    let settings = store.get(BACKGROUND_SETTINGS, "settings").await.unwrap().unwrap();
    assert_eq!(settings["selectedImageUrl"], json!(first));
}

#[tokio::test]
async fn test_empty_persisted_list_is_uninitialized() {
    let store = memory_store();
    store.set(BACKGROUND_IMAGES, "images", &json!([])).await.unwrap();

    let (library, _) = create_test_library(store);
    library.init().await;
    assert_eq!(library.entries().len(), 4);
}

#[tokio::test]
async fn test_add_data_uri_to_empty_library() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;
    remove_all(&library).await;
    assert!(library.entries().is_empty());
    assert_eq!(library.selected_url(), None);
    assert_eq!(library.display_url(), None);

    let entry = library.add_image(PNG, None).await.unwrap();

    assert_eq!(library.entries(), vec![entry.clone()]);
    assert_eq!(entry.url, PNG);
    assert_eq!(library.selected_url().as_deref(), Some(PNG));

    let display = library.display_url().unwrap();
    assert!(is_handle(&display));
    assert_eq!(library.resolver().reverse_resolve(&display).as_deref(), Some(PNG));
}

#[tokio::test]
async fn test_added_entry_survives_reload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("tabula.db");

    let added = {
        let store = Arc::new(SqliteStore::open(&db_path, &TABULA_SCHEMA).unwrap());
        let (library, _) = create_test_library(store);
        library.init().await;
        library.add_image(VIDEO, Some(VIDEO_THUMB)).await.unwrap()
    };

    let store = Arc::new(SqliteStore::open(&db_path, &TABULA_SCHEMA).unwrap());
    let (library, _) = create_test_library(store);
    library.init().await;

    let reloaded = library
        .entries()
        .into_iter()
        .find(|e| e.id == added.id)
        .expect("entry lost across reload");
    assert_eq!(reloaded.url, VIDEO);
    assert_eq!(reloaded.thumbnail.as_deref(), Some(VIDEO_THUMB));
    assert_eq!(library.entries().len(), 5);
}

#[tokio::test]
async fn test_selection_restored_after_reload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("tabula.db");
    let third = DEFAULT_ENTRIES[2].1;

    {
        let store = Arc::new(SqliteStore::open(&db_path, &TABULA_SCHEMA).unwrap());
        let (library, _) = create_test_library(store);
        library.init().await;
        assert!(library.select_image(third).await);
    }

    let store = Arc::new(SqliteStore::open(&db_path, &TABULA_SCHEMA).unwrap());
    let (library, _) = create_test_library(store);
    library.init().await;
    assert_eq!(library.selected_url().as_deref(), Some(third));
}

#[tokio::test]
async fn test_dangling_persisted_selection_heals() {
    let store = memory_store();
    store
        .set(
            BACKGROUND_SETTINGS,
            "settings",
            &json!({"selectedImageUrl": "https://example.com/removed.jpg"}),
        )
        .await
        .unwrap();

    let (library, _) = create_test_library(store.clone());
    library.init().await;

    let first = DEFAULT_ENTRIES[0].1;
    assert_eq!(library.selected_url().as_deref(), Some(first));
    let settings = store.get(BACKGROUND_SETTINGS, "settings").await.unwrap().unwrap();
    assert_eq!(settings["selectedImageUrl"], json!(first));
}

#[tokio::test]
async fn test_legacy_entries_are_migrated() {
    let store = memory_store();
    store
        .set(
            BACKGROUND_IMAGES,
            "images",
            &json!(["https://example.com/a.jpg", {"url": "https://example.com/b.jpg"}, {"id": "x"}]),
        )
        .await
        .unwrap();

    let (library, _) = create_test_library(store.clone());
    library.init().await;

    let entries = library.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].url, "https://example.com/a.jpg");
    assert_eq!(entries[1].url, "https://example.com/b.jpg");
    assert_ne!(entries[0].id, entries[1].id);

    // Réécrit au format courant
    let persisted: Vec<MediaEntry> = serde_json::from_value(
        store.get(BACKGROUND_IMAGES, "images").await.unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(persisted, entries);
}

#[tokio::test]
async fn test_new_ids_never_reuse_loaded_ids() {
    let store = memory_store();
    let far_future = "99999999999999";
    store
        .set(
            BACKGROUND_IMAGES,
            "images",
            &json!([{"id": far_future, "url": "https://example.com/a.jpg"}]),
        )
        .await
        .unwrap();

    let (library, _) = create_test_library(store);
    library.init().await;
    let entry = library.add_image("https://example.com/b.jpg", None).await.unwrap();
    assert!(entry.id.parse::<u64>().unwrap() > far_future.parse::<u64>().unwrap());
}

#[tokio::test]
async fn test_remove_selected_falls_back_to_first() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;

    // [A, B], A sélectionné
    let entries = library.entries();
    library.remove_image(&entries[2].id).await;
    library.remove_image(&entries[3].id).await;
    let (a, b) = (&entries[0], &entries[1]);
    assert_eq!(library.selected_url().as_deref(), Some(a.url.as_str()));

    assert!(library.remove_image(&a.id).await);
    assert_eq!(library.selected_url().as_deref(), Some(b.url.as_str()));

    assert!(library.remove_image(&b.id).await);
    assert_eq!(library.selected_url(), None);
    assert_eq!(library.settings().selected_image_url, None);
}

#[tokio::test]
async fn test_remove_unselected_keeps_selection() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;
    let entries = library.entries();

    assert!(library.select_image(&entries[1].url).await);
    assert!(library.remove_image(&entries[3].id).await);
    assert_eq!(library.selected_url().as_deref(), Some(entries[1].url.as_str()));

    assert!(!library.remove_image("no-such-id").await);
}

#[tokio::test]
async fn test_select_by_handle_and_unknown() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;
    let entry = library.add_image(PNG, None).await.unwrap();

    let handle = library.resolver().resolve(PNG).await;
    assert!(library.select_image(&handle).await);
    assert_eq!(library.selected_url().as_deref(), Some(entry.url.as_str()));
    assert_eq!(library.display_url().as_deref(), Some(handle.as_str()));

    let before = library.selected_url();
    assert!(!library.select_image("https://example.com/unknown.jpg").await);
    assert_eq!(library.selected_url(), before);
}

#[tokio::test]
async fn test_add_rejects_empty_and_unknown_handle() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;

    assert!(matches!(library.add_image("  ", None).await, Err(Error::EmptyPayload)));
    assert!(matches!(
        library.add_image("blob:tabula/unknown", None).await,
        Err(Error::UnknownHandle(_))
    ));
    assert_eq!(library.entries().len(), 4);
}

#[tokio::test]
async fn test_add_handle_stores_durable_payload() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;

    let handle = library.resolver().resolve(PNG).await;
    let entry = library.add_image(&handle, None).await.unwrap();
    assert_eq!(entry.url, PNG);
}

#[tokio::test]
async fn test_thumbnail_slot_follows_selection() {
    let (library, slot) = create_test_library(memory_store());
    library.init().await;
    assert_eq!(slot.get(), None);

    library.add_image(VIDEO, Some(VIDEO_THUMB)).await.unwrap();
    assert!(library.select_image(VIDEO).await);
    assert_eq!(library.cached_thumbnail().as_deref(), Some(VIDEO_THUMB));

    // Une entrée sans vignette vide le slot
    assert!(library.select_image(DEFAULT_ENTRIES[1].1).await);
    assert_eq!(slot.get(), None);
}

#[tokio::test]
async fn test_random_selection_stays_valid() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;

    for _ in 0..20 {
        let picked = library.select_random_image().await.unwrap();
        assert_eq!(library.selected_url().as_deref(), Some(picked.url.as_str()));
        assert_selection_invariant(&library);
    }

    // Aucune vidéo parmi les défauts
    assert!(library.select_random_video().await.is_none());

    library.add_image("https://cdn.example.com/loop.mp4", None).await.unwrap();
    let video = library.select_random_video().await.unwrap();
    assert_eq!(video.url, "https://cdn.example.com/loop.mp4");
}

#[tokio::test]
async fn test_random_on_empty_library_is_noop() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;
    remove_all(&library).await;
    assert!(library.select_random_image().await.is_none());
    assert_eq!(library.selected_url(), None);
}

#[tokio::test]
async fn test_selection_invariant_across_mutations() {
    let (library, _) = create_test_library(memory_store());
    library.init().await;
    assert_selection_invariant(&library);

    let a = library.add_image(PNG, None).await.unwrap();
    assert_selection_invariant(&library);
    library.select_image(&a.url).await;
    assert_selection_invariant(&library);
    library.remove_image(&a.id).await;
    assert_selection_invariant(&library);
    remove_all(&library).await;
    assert_selection_invariant(&library);
    library.add_image(VIDEO, Some(VIDEO_THUMB)).await.unwrap();
    assert_selection_invariant(&library);
    assert_eq!(library.selected_url().as_deref(), Some(VIDEO));
}

#[tokio::test]
async fn test_update_settings_publishes_conditions() {
    let store = memory_store();
    let (library, _) = create_test_library(store.clone());
    library.init().await;
    let mut conditions = library.subscribe();
    let _ = conditions.borrow_and_update();

    let settings = library
        .update_settings(&BackgroundSettingsPatch {
            change_by_time: Some(true),
            shuffle: Some(true),
            change_interval: Some(5),
            ..Default::default()
        })
        .await;
    assert!(settings.change_by_time);

    assert!(conditions.has_changed().unwrap());
    let current = *conditions.borrow_and_update();
    assert_eq!(current.image.interval, Some(5));
    assert_eq!(current.image.entries, 4);

    // Seul showOverlay change : les conditions restent identiques
    library
        .update_settings(&BackgroundSettingsPatch {
            show_overlay: Some(false),
            ..Default::default()
        })
        .await;
    assert!(!conditions.has_changed().unwrap());

    let persisted = store.get(BACKGROUND_SETTINGS, "settings").await.unwrap().unwrap();
    assert_eq!(persisted["changeInterval"], json!(5));
    assert_eq!(persisted["showOverlay"], json!(false));
}

#[tokio::test]
async fn test_write_failures_keep_memory_state() {
    let store = Arc::new(FlakyStore::new());
    let (library, _) = create_test_library(store.clone());
    library.init().await;

    store.fail_writes.store(true, Ordering::SeqCst);
    let entry = library.add_image(PNG, None).await.unwrap();
    assert!(library.select_image(PNG).await);
    assert_eq!(library.entries().len(), 5);
    assert_eq!(library.selected_url().as_deref(), Some(PNG));

    // Le store n'a rien vu
    let persisted = store.get(BACKGROUND_IMAGES, "images").await.unwrap().unwrap();
    assert_eq!(persisted.as_array().unwrap().len(), 4);

    // Une écriture réussie réconcilie
    store.fail_writes.store(false, Ordering::SeqCst);
    library.add_image("https://example.com/c.jpg", None).await.unwrap();
    let persisted: Vec<MediaEntry> = serde_json::from_value(
        store.get(BACKGROUND_IMAGES, "images").await.unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(persisted.len(), 6);
    assert!(persisted.iter().any(|e| e.id == entry.id));
}

#[tokio::test]
async fn test_remove_during_slow_write_keeps_newer_selection() {
    let store = Arc::new(GatedStore::new());
    let (library, _) = create_test_library(store.clone());
    let library = Arc::new(library);
    library.init().await;

    let entries = library.entries();
    assert_eq!(library.selected_url().as_deref(), Some(entries[0].url.as_str()));

    store.hold_entries.store(true, Ordering::SeqCst);
    let remover = {
        let library = library.clone();
        let id = entries[0].id.clone();
        tokio::spawn(async move { library.remove_image(&id).await })
    };
    store.entered.notified().await;

    // Écriture en cours : la sélection désigne déjà une entrée existante
    assert_selection_invariant(&library);
    assert_eq!(library.selected_url().as_deref(), Some(entries[1].url.as_str()));

    // Choix de l'utilisateur pendant l'écriture
    assert!(library.select_image(&entries[3].url).await);

    store.release.notify_one();
    assert!(remover.await.unwrap());

    assert_eq!(library.selected_url().as_deref(), Some(entries[3].url.as_str()));
    assert_eq!(library.display_url().as_deref(), Some(entries[3].url.as_str()));
    let settings = store.get(BACKGROUND_SETTINGS, "settings").await.unwrap().unwrap();
    assert_eq!(settings["selectedImageUrl"], json!(entries[3].url));
    let persisted = store.get(BACKGROUND_IMAGES, "images").await.unwrap().unwrap();
    assert_eq!(persisted.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_slow_resolution_does_not_override_newer_selection() {
    const SVG: &str = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%2F%3E";

    let fetcher = Arc::new(GatedFetcher {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let library = Arc::new(BackgroundLibrary::new(
        memory_store(),
        Arc::new(Resolver::with_fetcher(fetcher.clone())),
        Arc::new(MemoryThumbnailSlot::new()),
    ));
    library.init().await;
    library.add_image(SVG, None).await.unwrap();

    let slow = {
        let library = library.clone();
        tokio::spawn(async move { library.select_image(SVG).await })
    };
    fetcher.entered.notified().await;
    assert_eq!(library.selected_url().as_deref(), Some(SVG));
    assert_eq!(library.display_url(), None);

    let newer = DEFAULT_ENTRIES[1].1;
    assert!(library.select_image(newer).await);
    assert_eq!(library.display_url().as_deref(), Some(newer));

    fetcher.release.notify_one();
    assert!(slow.await.unwrap());

    // La résolution tardive du SVG est ignorée
    assert_eq!(library.selected_url().as_deref(), Some(newer));
    assert_eq!(library.display_url().as_deref(), Some(newer));
}

#[tokio::test]
async fn test_settings_read_failure_does_not_overwrite_store() {
    let store = Arc::new(FlakyStore::new());
    let saved = json!({
        "changeByTime": true,
        "shuffle": true,
        "changeInterval": 7,
        "showOverlay": false
    });
    store.inner.set(BACKGROUND_SETTINGS, "settings", &saved).await.unwrap();
    store.fail_settings_read.store(true, Ordering::SeqCst);

    let (library, _) = create_test_library(store.clone());
    library.init().await;

    // Sélection restaurée, miroir tenu en mémoire
    let first = DEFAULT_ENTRIES[0].1;
    assert_eq!(library.selected_url().as_deref(), Some(first));
    assert_eq!(library.settings().selected_image_url.as_deref(), Some(first));

    let persisted = store.get(BACKGROUND_SETTINGS, "settings").await.unwrap().unwrap();
    assert_eq!(persisted, saved);
}

#[tokio::test]
async fn test_selection_changes_are_published() {
    let (library, _) = create_test_library(memory_store());
    let mut selection = library.watch_selection();
    library.init().await;

    assert!(selection.has_changed().unwrap());
    assert_eq!(
        selection.borrow_and_update().as_deref(),
        Some(DEFAULT_ENTRIES[0].1)
    );

    let entries = library.entries();
    library.remove_image(&entries[0].id).await;
    assert_eq!(
        selection.borrow_and_update().as_deref(),
        Some(entries[1].url.as_str())
    );

    // Retrait d'une entrée non sélectionnée : rien à publier
    library.remove_image(&entries[3].id).await;
    assert!(!selection.has_changed().unwrap());
}
