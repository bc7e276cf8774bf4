// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Catalog Memoization Example
//!
//! A storefront renders product listings by querying a slow remote catalog. The listing query is
//! memoized by its canonical key, so:
//! - repeated renders within the TTL are served from memory
//! - a burst of concurrent renders for the same page triggers a single remote call
//! - reordered query parameters still hit the same entry

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use anyspawn::Spawner;
use serde_json::json;
use tick::Clock;
use vitrine_cache::{CacheKey, TtlCache};

#[derive(Debug, Clone)]
struct RemoteCatalog {
    calls: Arc<AtomicU32>,
}

impl RemoteCatalog {
    async fn list_products(&self, category: &str, page: u32) -> Result<Vec<String>, String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(80)).await;
        Ok((1..=3).map(|i| format!("{category}-{page}-{i}")).collect())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let clock = Clock::new_tokio();
    let cache = TtlCache::builder::<CacheKey, Vec<String>>(clock)
        .name("catalog")
        .default_ttl(Duration::from_secs(120))
        .build();
    cache.spawn_sweeper(&Spawner::new_tokio());

    let catalog = RemoteCatalog {
        calls: Arc::new(AtomicU32::new(0)),
    };

    // Ten concurrent renders of the same listing.
    let key = CacheKey::for_query("products", &json!({ "category": "robes", "page": 1 }))?;
    let renders: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            let catalog = catalog.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .cached_query_default_ttl(key, || async move { catalog.list_products("robes", 1).await })
                    .await
            })
        })
        .collect();

    for render in renders {
        let products = render.await??;
        assert_eq!(products.len(), 3);
    }
    println!("10 concurrent renders, remote calls: {}", catalog.calls.load(Ordering::Relaxed));

    // Same parameters in a different order map to the same entry.
    let reordered = CacheKey::for_query("products", &json!({ "page": 1, "category": "robes" }))?;
    let products = cache
        .cached_query_default_ttl(reordered.clone(), || catalog.list_products("robes", 1))
        .await?;
    println!("{reordered} -> {products:?}");
    println!("remote calls after reordered lookup: {}", catalog.calls.load(Ordering::Relaxed));

    cache.destroy();
    Ok(())
}
