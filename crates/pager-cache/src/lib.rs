//! Cache regions for the pager engine.
//!
//! Each cache instance owns its storage behind its own lock. Callers never
//! touch the storage directly; every mutation is a request/response call
//! (`load`, a continuation, `update`), and no lock is held while a remote
//! loader runs or while subscribers are notified.
//!
//! # Architecture
//!
//! - `broadcast` - multi-subscriber change notification ([`Broadcaster`])
//! - `page_cache` - ordered elements + identity index + session key ([`PageCache`])
//! - `cursor` / `offset` - paginators over a [`PageCache`]
//! - `item` - single-item single-flight cache with capacity and TTL bounds ([`ItemLoader`])

mod broadcast;
mod cursor;
mod item;
mod offset;
mod page_cache;
mod session;

pub use broadcast::{Broadcaster, Subscription};
pub use cursor::{CursorPage, CursorPaginator};
pub use item::{ItemCacheConfig, ItemLoader};
pub use offset::{OffsetPage, OffsetPaginator, OffsetPosition};
pub use page_cache::{ApplySummary, PageCache, StoreOutcome};
