use std::sync::Arc;

use anyhow::{Context, Result};
use pager_engine::{DataLoader, LoaderConfig, SearchLoader, StateStore};
use pager_model::{Difference, LoadMoreState, LoadingState};
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogError};
use crate::types::{
    BrowseOptions, BrowseReport, SearchAttempt, SearchOptions, SearchOutcome, SearchReport,
};

/// Page through the catalog, then apply the requested removals locally.
pub async fn run_browse(
    catalog: &Catalog,
    config: &LoaderConfig,
    options: &BrowseOptions,
) -> Result<BrowseReport> {
    let paginator = catalog.offset_paginator(options.page_size);
    let artist = options.artist.clone();
    let source = paginator.clone();
    let loader = DataLoader::paged(
        move || Ok::<_, CatalogError>(artist.clone()),
        move |artist: Option<String>| {
            let source = source.clone();
            async move { source.load(artist).await }
        },
    )
    .with_config(config);

    loader.load(false).await.context("load first page")?;
    let mut pages = 1;
    while loader.state().load_more().is_some_and(LoadMoreState::is_ready) {
        if options.max_pages.is_some_and(|max| pages >= max) {
            debug!(pages, "page limit reached");
            break;
        }
        loader
            .load_more()
            .await
            .with_context(|| format!("load page {}", pages + 1))?;
        pages += 1;
    }
    let exhausted = !loader.state().load_more().is_some_and(LoadMoreState::is_ready);
    info!(pages, exhausted, requests = catalog.requests(), "browse finished");

    let mut removed = 0;
    if !options.remove.is_empty() && loader.state().is_loaded() {
        let mut updates = paginator.subscribe();
        let before = loader.state().model().map_or(0, |page| page.len());
        let remove = &options.remove;
        paginator
            .update(|albums| {
                albums
                    .iter()
                    .filter(|album| remove.contains(&album.id))
                    .fold(Difference::none(), |diff, album| diff.delete(album.id))
            })
            .await;
        // the loader only learns about local edits through the broadcast
        if let Some(view) = updates.try_recv() {
            removed = before.saturating_sub(view.len());
            let next = if view.is_empty() {
                LoadingState::Empty(config.empty.clone())
            } else {
                let load_more = LoadMoreState::from_has_more(view.has_more());
                LoadingState::loaded(view, load_more)
            };
            loader.state_cell().set(next);
        }
        info!(removed, "local removals applied");
    }

    let state = loader.state();
    let empty_label = match &state {
        LoadingState::Empty(empty) => Some(empty.label.clone()),
        _ => None,
    };
    Ok(BrowseReport {
        albums: state.model().map(|page| page.items().to_vec()).unwrap_or_default(),
        pages,
        requests: catalog.requests(),
        removed,
        exhausted,
        state: state.name(),
        empty_label,
    })
}

/// Fire the search texts as keystrokes and report which one ran.
pub async fn run_search(
    catalog: &Catalog,
    config: &LoaderConfig,
    options: &SearchOptions,
) -> Result<SearchReport> {
    let mut config = config.clone();
    if let Some(debounce_ms) = options.debounce_ms {
        config.debounce_ms = debounce_ms;
    }
    let source = catalog.clone();
    let search = Arc::new(SearchLoader::from_config(
        &config,
        |text: &str| {
            let text = text.trim();
            if text.is_empty() {
                Err(CatalogError::EmptyQuery)
            } else {
                Ok(text.to_lowercase())
            }
        },
        move |text: String| source.search(text),
    ));

    let mut running = Vec::with_capacity(options.texts.len());
    for (index, text) in options.texts.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(options.interval).await;
        }
        debug!(text = %text, "keystroke");
        let search = Arc::clone(&search);
        let typed = text.clone();
        running.push((
            text.clone(),
            tokio::spawn(async move { search.search(typed).await }),
        ));
    }

    let mut attempts = Vec::with_capacity(running.len());
    for (text, task) in running {
        let outcome = match task.await.context("search task failed")? {
            Ok(found) => SearchOutcome::Found(found.len()),
            Err(err) if err.is_cancelled() => SearchOutcome::Superseded,
            Err(err) => SearchOutcome::Failed(err.user_message()),
        };
        attempts.push(SearchAttempt { text, outcome });
    }
    info!(requests = catalog.requests(), "search burst finished");

    Ok(SearchReport {
        attempts,
        results: search.state().model().cloned().unwrap_or_default(),
        requests: catalog.requests(),
        debounce: config.debounce_delay(),
    })
}
