//! End-to-end scenarios for per-plugin storage and capability scoping.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gamedock_kernel::cache::{Cache, CacheError, MemoryCache};
use gamedock_kernel::domain::{EntityType, PluginStorageEntry};
use gamedock_kernel::filters::FindPluginStorage;
use gamedock_kernel::repositories::memory::MemoryPluginStorageRepository;
use gamedock_kernel::repositories::PluginStorageRepository;

fn entry(plugin_id: u64, key: &str, payload: &[u8]) -> PluginStorageEntry {
    PluginStorageEntry {
        plugin_id,
        key: key.to_string(),
        payload: payload.to_vec(),
        ..Default::default()
    }
}

// S1: saving the same tuple twice keeps the ID and overwrites the payload.
#[tokio::test]
async fn upsert_scenario() {
    let repo = MemoryPluginStorageRepository::new();

    let mut first = entry(1, "c", b"A");
    repo.save(&mut first).await.unwrap();
    let assigned = first.id;

    let mut second = entry(1, "c", b"B");
    repo.save(&mut second).await.unwrap();
    assert_eq!(second.id, assigned);

    let found = repo
        .find(
            &FindPluginStorage {
                ids: vec![assigned],
                ..Default::default()
            },
            &[],
            None,
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].payload, b"B");
    assert!(found[0].updated_at.unwrap() >= found[0].created_at.unwrap());
}

// S2: same key scoped to two different entities gives two entries.
#[tokio::test]
async fn entity_scoping_scenario() {
    let repo = MemoryPluginStorageRepository::new();

    let mut one = entry(20, "stats", b"P1");
    one.entity_type = Some(EntityType::Server);
    one.entity_id = Some(1);
    let mut two = entry(20, "stats", b"P2");
    two.entity_type = Some(EntityType::Server);
    two.entity_id = Some(2);

    repo.save(&mut one).await.unwrap();
    repo.save(&mut two).await.unwrap();
    assert_ne!(one.id, two.id);

    let found = repo
        .find(
            &FindPluginStorage {
                plugin_ids: vec![20],
                keys: vec!["stats".to_string()],
                ..Default::default()
            },
            &[],
            None,
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    let mut payloads: Vec<&[u8]> = found.iter().map(|e| e.payload.as_slice()).collect();
    payloads.sort();
    assert_eq!(payloads, vec![b"P1".as_slice(), b"P2".as_slice()]);
}

// Two plugins saving the same key never observe each other's entries.
#[tokio::test]
async fn storage_is_scoped_per_plugin() {
    let repo = MemoryPluginStorageRepository::new();

    repo.save(&mut entry(1, "shared-key", b"from-plugin-1"))
        .await
        .unwrap();
    repo.save(&mut entry(2, "shared-key", b"from-plugin-2"))
        .await
        .unwrap();

    for (plugin_id, expected) in [(1u64, b"from-plugin-1".as_slice()), (2, b"from-plugin-2")] {
        let found = repo
            .find(
                &FindPluginStorage {
                    plugin_ids: vec![plugin_id],
                    keys: vec!["shared-key".to_string()],
                    ..Default::default()
                },
                &[],
                None,
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, expected);
    }
}

#[tokio::test]
async fn delete_by_plugin_is_isolated() {
    let repo = MemoryPluginStorageRepository::new();

    for (plugin_id, key) in [(1u64, "a"), (1, "b"), (2, "a"), (3, "z")] {
        repo.save(&mut entry(plugin_id, key, b"x")).await.unwrap();
    }

    repo.delete_by_plugin(1).await.unwrap();

    let rest = repo
        .find(&FindPluginStorage::default(), &[], None)
        .await
        .unwrap();
    let mut owners: Vec<u64> = rest.iter().map(|e| e.plugin_id).collect();
    owners.sort();
    assert_eq!(owners, vec![2, 3]);
}

// The cache prefixes the manager derives per plugin keep identical guest
// keys from colliding.
#[tokio::test]
async fn cache_keys_do_not_collide_across_plugins() {
    let cache = MemoryCache::new();

    // Same guest-visible key, two plugin prefixes.
    cache
        .set("plugin:alpha:counter", b"1".to_vec(), None)
        .await
        .unwrap();
    cache
        .set("plugin:beta:counter", b"2".to_vec(), None)
        .await
        .unwrap();

    assert_eq!(cache.get("plugin:alpha:counter").await.unwrap(), b"1");
    assert_eq!(cache.get("plugin:beta:counter").await.unwrap(), b"2");

    cache.delete("plugin:alpha:counter").await.unwrap();
    assert!(matches!(
        cache.get("plugin:alpha:counter").await,
        Err(CacheError::NotFound)
    ));
    assert_eq!(cache.get("plugin:beta:counter").await.unwrap(), b"2");
}
