//! End-to-end tests: data loaders driving the cache crate's paginators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pager_cache::{OffsetPage, OffsetPaginator};
use pager_engine::{DataLoader, LoadingEngine, StateStore};
use pager_model::{Identifiable, LoadError, LoadMoreState, LoadingState, Paginated};

#[derive(Debug, Clone, PartialEq)]
struct Song {
    id: u32,
    genre: &'static str,
}

impl Identifiable for Song {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

const CATALOG: [(u32, &str); 8] = [
    (1, "jazz"),
    (2, "rock"),
    (3, "jazz"),
    (4, "jazz"),
    (5, "jazz"),
    (6, "rock"),
    (7, "jazz"),
    (8, "jazz"),
];

struct Backend {
    fail: AtomicBool,
    requests: Mutex<Vec<(String, usize)>>,
}

impl Backend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

type SongLoader = DataLoader<String, Paginated<Song, String>, String>;

/// Songs of the selected genre, three per page.
fn song_loader(backend: &Arc<Backend>, genre: &Arc<Mutex<String>>) -> SongLoader {
    let source = Arc::clone(backend);
    let paginator = OffsetPaginator::new(move |genre: String, offset: usize| {
        source.requests.lock().unwrap().push((genre.clone(), offset));
        let fail = source.fail.load(Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            if fail {
                return Err(format!("backend refused {genre}@{offset}"));
            }
            let matching: Vec<Song> = CATALOG
                .iter()
                .filter(|(_, g)| *g == genre)
                .map(|&(id, genre)| Song { id, genre })
                .collect();
            let end = (offset + 3).min(matching.len());
            let items = matching[offset.min(end)..end].to_vec();
            Ok(OffsetPage::new(items, end < matching.len()))
        }
    });

    let selected = Arc::clone(genre);
    DataLoader::paged(
        move || Ok(selected.lock().unwrap().clone()),
        move |genre: String| {
            let paginator = paginator.clone();
            async move { paginator.load(genre).await }
        },
    )
}

fn ids(state: &LoadingState<Paginated<Song, String>, LoadError<String>>) -> Vec<u32> {
    state
        .model()
        .map(|page| page.items().iter().map(|song| song.id).collect())
        .unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn test_pages_accumulate_until_exhausted() {
    let backend = Backend::new();
    let loader = song_loader(&backend, &Arc::new(Mutex::new("jazz".to_string())));

    loader.load(false).await.unwrap();
    assert_eq!(ids(&loader.state()), vec![1, 3, 4]);
    assert_eq!(loader.state().load_more(), Some(&LoadMoreState::Ready));

    loader.load_more().await.unwrap();
    assert_eq!(ids(&loader.state()), vec![1, 3, 4, 5, 7, 8]);
    assert_eq!(loader.state().load_more(), Some(&LoadMoreState::Unavailable));

    // nothing more to fetch
    loader.load_more().await.unwrap();
    assert_eq!(
        backend.requests(),
        vec![("jazz".to_string(), 0), ("jazz".to_string(), 3)]
    );
    assert!(loader.state().model().is_some_and(|page| page.items().iter().all(|s| s.genre == "jazz")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_page_keeps_loaded_pages() {
    let backend = Backend::new();
    let loader = song_loader(&backend, &Arc::new(Mutex::new("jazz".to_string())));
    loader.load(false).await.unwrap();

    backend.fail.store(true, Ordering::SeqCst);
    let err = loader.load_more().await.unwrap_err();
    assert_eq!(err, LoadError::Failed("backend refused jazz@3".to_string()));
    assert_eq!(ids(&loader.state()), vec![1, 3, 4]);
    assert_eq!(loader.state().load_more(), Some(&LoadMoreState::Ready));

    // the failure invalidated the query cache, so the same query refetches
    backend.fail.store(false, Ordering::SeqCst);
    loader.load(false).await.unwrap();
    assert_eq!(ids(&loader.state()), vec![1, 3, 4]);
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_failed_page_continues() {
    let backend = Backend::new();
    let loader = song_loader(&backend, &Arc::new(Mutex::new("jazz".to_string())));
    loader.load(false).await.unwrap();

    backend.fail.store(true, Ordering::SeqCst);
    assert!(loader.load_more().await.is_err());
    backend.fail.store(false, Ordering::SeqCst);
    loader.load_more().await.unwrap();
    assert_eq!(ids(&loader.state()), vec![1, 3, 4, 5, 7, 8]);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_page_fetch_can_be_retried() {
    let backend = Backend::new();
    let loader = song_loader(&backend, &Arc::new(Mutex::new("jazz".to_string())));
    loader.load(false).await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(10), loader.load_more()).await;
    assert!(timed_out.is_err());
    assert_eq!(ids(&loader.state()), vec![1, 3, 4]);
    assert_eq!(loader.state().load_more(), Some(&LoadMoreState::Ready));

    tokio::time::sleep(Duration::from_millis(100)).await;
    loader.load_more().await.unwrap();
    assert_eq!(ids(&loader.state()), vec![1, 3, 4, 5, 7, 8]);
    assert_eq!(loader.state().load_more(), Some(&LoadMoreState::Unavailable));
    assert_eq!(
        backend.requests(),
        vec![
            ("jazz".to_string(), 0),
            ("jazz".to_string(), 3),
            ("jazz".to_string(), 3),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_changing_the_query_replaces_pages() {
    let backend = Backend::new();
    let genre = Arc::new(Mutex::new("jazz".to_string()));
    let loader = song_loader(&backend, &genre);
    loader.load(false).await.unwrap();
    loader.load_more().await.unwrap();

    *genre.lock().unwrap() = "rock".to_string();
    loader.load(false).await.unwrap();
    assert_eq!(ids(&loader.state()), vec![2, 6]);
    assert_eq!(loader.state().load_more(), Some(&LoadMoreState::Unavailable));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_genre_is_empty() {
    let backend = Backend::new();
    let loader = song_loader(&backend, &Arc::new(Mutex::new("polka".to_string())));
    let page = loader.load(false).await.unwrap();
    assert!(page.is_empty());
    assert!(matches!(loader.state(), LoadingState::Empty(_)));
    // load-more on an empty state does nothing
    loader.load_more().await.unwrap();
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_load_during_load_more_wins() {
    let backend = Backend::new();
    let genre = Arc::new(Mutex::new("jazz".to_string()));
    let loader = Arc::new(song_loader(&backend, &genre));
    loader.load(false).await.unwrap();

    let more = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load_more().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(loader.state().load_more().is_some_and(LoadMoreState::is_in_progress));

    *genre.lock().unwrap() = "rock".to_string();
    loader.load(false).await.unwrap();
    more.await.unwrap().unwrap();
    assert_eq!(ids(&loader.state()), vec![2, 6]);
}

/// Store that records every state it is given.
#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<LoadingState<Vec<u8>, LoadError<String>>>>,
}

impl StateStore<Vec<u8>, LoadError<String>> for Recorder {
    fn current(&self) -> LoadingState<Vec<u8>, LoadError<String>> {
        self.states.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn set(&self, state: LoadingState<Vec<u8>, LoadError<String>>) {
        self.states.lock().unwrap().push(state);
    }
}

impl Recorder {
    fn names(&self) -> Vec<&'static str> {
        self.states.lock().unwrap().iter().map(LoadingState::name).collect()
    }
}

#[tokio::test(start_paused = true)]
async fn test_engine_transitions_through_custom_store() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let engine = LoadingEngine::new(move |size: usize| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if size == 99 {
                Err("too large".to_string())
            } else {
                Ok(vec![0u8; size])
            }
        }
    });
    let store = Recorder::default();

    engine.load_model(2, false, &store).await.unwrap();
    engine.load_model(0, false, &store).await.unwrap();
    engine.load_model(99, false, &store).await.unwrap_err();
    assert_eq!(
        store.names(),
        vec!["in_progress", "loaded", "in_progress", "empty", "in_progress", "empty"]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
