//! Session-scoped query cache.
//!
//! One [`QueryCache`] lives per client session, or per request on the server
//! during prefetch. Collections are stored as `Arc<Vec<T>>` and are never
//! mutated in place: readers get a cheap clone of the `Arc` and every write
//! replaces it.
//!
//! ```text
//! loader ──set──▶ QueryCache ──dehydrate──▶ page JSON ──hydrate──▶ QueryCache (client)
//!                     ▲                                              │
//!                     └──────── update / restore / invalidate ◀── mutations
//! ```

mod keys;
pub(crate) mod lock;
mod store;

pub use keys::QueryKey;
pub use store::{
    CacheEntry, DehydratedQuery, DehydratedState, METRIC_QUERY_CACHE_HIT, METRIC_QUERY_CACHE_MISS,
    QueryCache,
};
