//! In-memory album catalog with simulated latency.
//!
//! Stands in for a remote service: every request sleeps for the configured
//! latency and is counted, so the demo can show how many fetches the engine
//! actually issued.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use pager_cache::{OffsetPage, OffsetPaginator};
use pager_model::Identifiable;
use thiserror::Error;
use tracing::trace;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: u32,
    pub title: String,
    pub artist: String,
    pub year: u16,
}

impl Identifiable for Album {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Catalog request failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("search text is empty")]
    EmptyQuery,

    #[error("catalog is offline")]
    Offline,
}

const DEMO: [(u32, &str, &str, u16); 16] = [
    (1, "Kind of Blue", "Miles Davis", 1959),
    (2, "A Love Supreme", "John Coltrane", 1965),
    (3, "Blue Train", "John Coltrane", 1958),
    (4, "Bitches Brew", "Miles Davis", 1970),
    (5, "Mingus Ah Um", "Charles Mingus", 1959),
    (6, "Time Out", "Dave Brubeck", 1959),
    (7, "Giant Steps", "John Coltrane", 1960),
    (8, "Sketches of Spain", "Miles Davis", 1960),
    (9, "Moanin'", "Art Blakey", 1958),
    (10, "Saxophone Colossus", "Sonny Rollins", 1956),
    (11, "Blue Moods", "Miles Davis", 1955),
    (12, "Blues and Roots", "Charles Mingus", 1960),
    (13, "The Shape of Jazz to Come", "Ornette Coleman", 1959),
    (14, "Somethin' Else", "Cannonball Adderley", 1958),
    (15, "Ballads", "John Coltrane", 1963),
    (16, "Maiden Voyage", "Herbie Hancock", 1965),
];

/// Shared handle to the catalog; clones see the same data and counters.
#[derive(Debug, Clone)]
pub struct Catalog {
    albums: Arc<Vec<Album>>,
    latency: Duration,
    requests: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
}

impl Catalog {
    /// Catalog over `albums`, answering immediately.
    pub fn new(albums: Vec<Album>) -> Self {
        Self {
            albums: Arc::new(albums),
            latency: Duration::ZERO,
            requests: Arc::new(AtomicUsize::new(0)),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The built-in demo catalog.
    pub fn demo() -> Self {
        Self::new(
            DEMO.iter()
                .map(|&(id, title, artist, year)| Album {
                    id,
                    title: title.to_string(),
                    artist: artist.to_string(),
                    year,
                })
                .collect(),
        )
    }

    /// Delay every request by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every following request fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.albums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    /// Albums by `artist` (all albums when `None`), `limit` at a time.
    pub fn page(
        &self,
        artist: Option<String>,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<OffsetPage<Album>, CatalogError>> + Send + 'static + use<> {
        let request = self.request();
        let albums = Arc::clone(&self.albums);
        async move {
            request.await?;
            let matching: Vec<&Album> = albums
                .iter()
                .filter(|album| artist.as_deref().is_none_or(|name| album.artist == name))
                .collect();
            let end = offset.saturating_add(limit).min(matching.len());
            let start = offset.min(end);
            trace!(offset, count = end - start, "catalog page served");
            let items = matching[start..end].iter().map(|&album| album.clone()).collect();
            Ok(OffsetPage::new(items, end < matching.len()))
        }
    }

    /// Albums whose title or artist contains `text` (case-insensitive).
    pub fn search(
        &self,
        text: String,
    ) -> impl Future<Output = Result<Vec<Album>, CatalogError>> + Send + 'static + use<> {
        let request = self.request();
        let albums = Arc::clone(&self.albums);
        async move {
            request.await?;
            let needle = text.to_lowercase();
            Ok(albums
                .iter()
                .filter(|album| {
                    album.title.to_lowercase().contains(&needle)
                        || album.artist.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect())
        }
    }

    /// Offset paginator over [`page`](Self::page), keyed by artist filter.
    pub fn offset_paginator(&self, page_size: usize) -> OffsetPaginator<Option<String>, Album, CatalogError> {
        let catalog = self.clone();
        OffsetPaginator::new(move |artist: Option<String>, offset| {
            catalog.page(artist, offset, page_size)
        })
    }

    fn request(&self) -> impl Future<Output = Result<(), CatalogError>> + Send + 'static + use<> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let offline = self.offline.load(Ordering::SeqCst);
        let latency = self.latency;
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if offline {
                Err(CatalogError::Offline)
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_filter_by_artist() {
        let catalog = Catalog::demo();
        let page = catalog
            .page(Some("John Coltrane".to_string()), 0, 3)
            .await
            .unwrap();
        let ids: Vec<u32> = page.items.iter().map(|album| album.id).collect();
        assert_eq!(ids, vec![2, 3, 7]);
        assert!(page.has_more);

        let last = catalog
            .page(Some("John Coltrane".to_string()), 3, 3)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
        assert_eq!(catalog.requests(), 2);
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let page = Catalog::demo().page(None, 99, 4).await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_search_matches_title_and_artist() {
        let catalog = Catalog::demo();
        let found = catalog.search("blue".to_string()).await.unwrap();
        let ids: Vec<u32> = found.iter().map(|album| album.id).collect();
        assert_eq!(ids, vec![1, 3, 11, 12]);
    }

    #[tokio::test]
    async fn test_offline_catalog_fails() {
        let catalog = Catalog::demo();
        catalog.set_offline(true);
        assert_eq!(
            catalog.search("blue".to_string()).await,
            Err(CatalogError::Offline)
        );
    }
}
