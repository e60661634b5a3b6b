//! Async loading engine for list and detail views.
//!
//! The engine turns a query into a model, tracks the work as a
//! [`LoadingState`](pager_model::LoadingState) and keeps repeated or
//! overlapping requests from doing duplicate work.
//!
//! # Architecture
//!
//! - `store` - where states live ([`StateStore`], [`StateCell`])
//! - `engine` - query caching, single-flight loads, revert on cancel ([`LoadingEngine`])
//! - `load_more` - next-page fetches for [`Paged`](pager_model::Paged) models ([`LoadMoreCoordinator`])
//! - `debounce` - trailing-edge debouncing on an injectable [`Clock`] ([`Debouncer`])
//! - `loader` / `search` - ready-made facades ([`DataLoader`], [`SearchLoader`])
//! - `config` - TOML loader settings ([`LoaderConfig`])
//!
//! # Example
//!
//! ```no_run
//! use pager_engine::DataLoader;
//! use pager_model::Paginated;
//!
//! async fn show() {
//!     let loader = DataLoader::paged(
//!         || Ok::<_, String>("rock".to_string()),
//!         |genre: String| async move { Ok(Paginated::complete(vec![genre])) },
//!     );
//!     loader.load(false).await.ok();
//!     loader.load_more().await.ok();
//!     println!("{}", loader.state().name());
//! }
//! ```

mod clock;
mod config;
mod debounce;
mod engine;
mod error;
mod load_more;
mod loader;
mod search;
mod store;
mod task;

pub use clock::{Clock, TokioClock};
pub use config::LoaderConfig;
pub use debounce::Debouncer;
pub use engine::LoadingEngine;
pub use error::ConfigError;
pub use load_more::LoadMoreCoordinator;
pub use loader::DataLoader;
pub use search::SearchLoader;
pub use store::{StateCell, StateStore};
