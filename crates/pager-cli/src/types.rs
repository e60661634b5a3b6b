use std::time::Duration;

use crate::catalog::Album;

/// Inputs of the `browse` command.
#[derive(Debug, Clone)]
pub struct BrowseOptions {
    pub artist: Option<String>,
    pub page_size: usize,
    pub max_pages: Option<usize>,
    pub remove: Vec<u32>,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            artist: None,
            page_size: 4,
            max_pages: None,
            remove: Vec::new(),
        }
    }
}

/// Inputs of the `search` command.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub texts: Vec<String>,
    pub interval: Duration,
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct BrowseReport {
    pub albums: Vec<Album>,
    pub pages: usize,
    pub requests: usize,
    pub removed: usize,
    pub exhausted: bool,
    /// Name of the final loading state.
    pub state: &'static str,
    pub empty_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A later keystroke superseded this search.
    Superseded,
    Found(usize),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SearchAttempt {
    pub text: String,
    pub outcome: SearchOutcome,
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub attempts: Vec<SearchAttempt>,
    pub results: Vec<Album>,
    pub requests: usize,
    pub debounce: Duration,
}
