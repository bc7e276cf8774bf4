// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process memoization with per-entry time-to-live.
//!
//! This crate provides [`TtlCache`], a key/value cache meant to sit in front of expensive remote
//! fetches (catalog pages, product lookups, order summaries). It offers:
//!
//! - Per-entry TTL with a configurable default of five minutes
//! - Lazy eviction: an expired entry is removed the moment it is read
//! - An opt-in background sweep that evicts entries nobody reads anymore
//! - [`cached_query`](TtlCache::cached_query) memoization with single-flight coalescing
//! - Canonical [`CacheKey`]s that do not depend on parameter insertion order
//!
//! All time is read from an injected [`tick::Clock`], so expiry is fully controllable in tests.
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```
//! use std::time::Duration;
//!
//! use tick::Clock;
//! use vitrine_cache::TtlCache;
//!
//! let clock = Clock::new_frozen();
//! let cache = TtlCache::<String, u32>::new(clock);
//!
//! cache.set("stock:sku-42".to_string(), 12);
//! cache.set_with_ttl("stock:sku-43".to_string(), 3, Duration::from_secs(30));
//!
//! assert_eq!(cache.get(&"stock:sku-42".to_string()), Some(12));
//! assert!(cache.has(&"stock:sku-43".to_string()));
//! ```
//!
//! ## Memoizing a remote fetch
//!
//! ```
//! use std::time::Duration;
//!
//! use tick::Clock;
//! use vitrine_cache::{CacheKey, TtlCache};
//! # futures::executor::block_on(async {
//!
//! let cache = TtlCache::<CacheKey, String>::new(Clock::new_frozen());
//! let key = CacheKey::for_query("products", &serde_json::json!({ "category": "robes", "page": 1 }))?;
//!
//! let page = cache
//!     .cached_query(key, || async { Ok::<_, String>("[...]".to_string()) }, Duration::from_secs(60))
//!     .await;
//! assert_eq!(page.as_deref(), Ok("[...]"));
//! # Ok::<(), vitrine_cache::KeyError>(())
//! # });
//! ```
//!
//! # Background sweep
//!
//! Entries that are never read again would otherwise stay in memory until [`TtlCache::clear`].
//! In a long-lived process, call [`TtlCache::spawn_sweeper`] once to evict expired entries on a
//! fixed interval, and [`TtlCache::destroy`] at shutdown to stop it. A cache that is never given a
//! spawner never owns a timer.

pub mod builder;
pub mod cache;
mod entry;
mod key;
mod sweep;
mod telemetry;

#[doc(inline)]
pub use builder::{CacheConfig, TtlCacheBuilder};
#[doc(inline)]
pub use cache::{CacheName, TtlCache};
#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use key::{CacheKey, KeyError};
