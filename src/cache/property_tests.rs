//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key derivation and the freshness, invalidation and
//! snapshot guarantees over generated inputs.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::testing::ScriptedFetcher;
use crate::cache::{
    derive_key, CacheOptions, CacheStatus, ManualClock, RequestCache, RequestOptions,
};

// == Strategies ==
/// Generates resource paths such as `/api/products/42`
fn url_strategy() -> impl Strategy<Value = String> {
    "/api/[a-z]{1,12}(/[0-9]{1,4})?".prop_map(|s| s)
}

fn method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("PATCH".to_string()),
        Just("DELETE".to_string()),
    ]
}

fn body_strategy() -> impl Strategy<Value = Option<Value>> {
    prop::option::of(("[a-z]{1,8}", any::<i32>()).prop_map(|(k, v)| json!({ k: v })))
}

fn request_strategy() -> impl Strategy<Value = RequestOptions> {
    (
        method_strategy(),
        prop::collection::btree_map("[a-z-]{1,10}", "[a-zA-Z0-9]{0,10}", 0..4),
        body_strategy(),
    )
        .prop_map(|(method, headers, body)| RequestOptions {
            method: Some(method),
            headers,
            body,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Two requests map to the same key exactly when method, URL, headers and
    // body all agree.
    #[test]
    fn prop_key_identity(
        url_a in url_strategy(),
        url_b in url_strategy(),
        req_a in request_strategy(),
        req_b in request_strategy(),
    ) {
        let same_request = url_a == url_b
            && req_a.method() == req_b.method()
            && req_a.headers == req_b.headers
            && req_a.body == req_b.body;
        prop_assert_eq!(derive_key(&url_a, &req_a) == derive_key(&url_b, &req_b), same_request);
    }

    // Header insertion order and name case never change the key.
    #[test]
    fn prop_key_ignores_header_order(
        url in url_strategy(),
        headers in prop::collection::vec(("[a-z]{1,8}", "[a-z0-9]{1,8}"), 0..6),
    ) {
        let unique: Vec<_> = {
            let mut seen = HashSet::new();
            headers.into_iter().filter(|(name, _)| seen.insert(name.clone())).collect()
        };

        let forward = unique
            .iter()
            .fold(RequestOptions::new(), |req, (name, value)| req.with_header(name, value.clone()));
        let backward = unique
            .iter()
            .rev()
            .fold(RequestOptions::new(), |req, (name, value)| {
                req.with_header(name.to_ascii_uppercase(), value.clone())
            });

        prop_assert_eq!(derive_key(&url, &forward), derive_key(&url, &backward));
    }

    // A second fetch inside max_age never calls upstream and returns the
    // first value.
    #[test]
    fn prop_fresh_entries_are_served_from_cache(
        url in url_strategy(),
        max_age_ms in 1u64..100_000,
        elapsed_fraction in 0.0f64..1.0,
    ) {
        let elapsed = ((max_age_ms as f64) * elapsed_fraction) as u64;
        prop_assume!(elapsed < max_age_ms);

        let fetcher = ScriptedFetcher::new();
        let clock = ManualClock::new(0);
        let cache = RequestCache::builder(fetcher.clone()).clock(clock.clone()).build();
        let options = CacheOptions::new().with_max_age(Duration::from_millis(max_age_ms));

        let (first, second) = runtime().block_on(async {
            let first = cache.fetch_entry(&url, &options, &RequestOptions::new()).await.unwrap();
            clock.advance(Duration::from_millis(elapsed));
            let second = cache.fetch_entry(&url, &options, &RequestOptions::new()).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(fetcher.calls(), 1);
        prop_assert_eq!(second.status, CacheStatus::Hit);
        prop_assert_eq!(first.value, second.value);
    }

    // After invalidating one identity, only that identity calls upstream again.
    #[test]
    fn prop_invalidate_targets_one_identity(
        urls in prop::collection::hash_set(url_strategy(), 2..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let urls: Vec<String> = urls.into_iter().collect();
        let target = pick.get(&urls).clone();

        let fetcher = ScriptedFetcher::new();
        let cache = RequestCache::builder(fetcher.clone()).clock(ManualClock::new(0)).build();
        let options = CacheOptions::default();

        let statuses = runtime().block_on(async {
            for url in &urls {
                cache.fetch_entry(url, &options, &RequestOptions::new()).await.unwrap();
            }
            cache.invalidate(&target, &RequestOptions::new());

            let mut statuses = Vec::new();
            for url in &urls {
                let fetched = cache.fetch_entry(url, &options, &RequestOptions::new()).await.unwrap();
                statuses.push((url.clone(), fetched.status));
            }
            statuses
        });

        for (url, status) in statuses {
            let expected = if url == target { CacheStatus::Miss } else { CacheStatus::Hit };
            prop_assert_eq!(status, expected);
        }
        prop_assert_eq!(fetcher.calls(), urls.len() + 1);
    }

    // Restoring a snapshot reproduces the exported entries exactly.
    #[test]
    fn prop_snapshot_restore_reproduces_entries(
        urls in prop::collection::hash_set(url_strategy(), 0..8),
    ) {
        let clock = ManualClock::new(1_000);
        let source = RequestCache::builder(ScriptedFetcher::new()).clock(clock.clone()).build();

        runtime().block_on(async {
            for url in &urls {
                source.fetch_entry(url, &CacheOptions::default(), &RequestOptions::new()).await.unwrap();
            }
        });

        let snapshot = source.snapshot();
        let restored = RequestCache::builder(ScriptedFetcher::new()).clock(clock).build();
        prop_assert_eq!(restored.restore(snapshot.clone()), urls.len());
        prop_assert_eq!(restored.snapshot(), snapshot);
        prop_assert_eq!(restored.keys(), source.keys());
    }
}
