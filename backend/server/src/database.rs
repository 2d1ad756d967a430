//! # Datastore
//!
//! Destinations and hunts are stored as opaque JSON blobs under auto-assigned ids.
//!
//! ## Redis layout
//!
//! - One hash per kind: `destinations`, `hunts`. Field is the id, value is the JSON blob.
//! - One counter per kind: `destinations:next_id`, `hunts:next_id`. `INCR` hands out ids, so
//!   ids start at 1 and never repeat, even across restarts.
//! - No TTLs. A record exists until it is overwritten.
//!
//! ## Memory layout
//!
//! Same shape in a `BTreeMap` behind a `RwLock`, for tests and for running without Redis.
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    time::Duration,
};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{Destination, ScavengerHunt};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("{kind} record could not be encoded: {source}")]
    Encode {
        kind: Kind,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Destination,
    ScavengerHunt,
}

impl Kind {
    pub fn hash_key(&self) -> &'static str {
        match self {
            Kind::Destination => "destinations",
            Kind::ScavengerHunt => "hunts",
        }
    }

    pub fn counter_key(&self) -> &'static str {
        match self {
            Kind::Destination => "destinations:next_id",
            Kind::ScavengerHunt => "hunts:next_id",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash_key())
    }
}

/// Key-value storage for JSON blobs.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Stores a new record and returns its freshly assigned id.
    async fn insert(&self, kind: Kind, json: String) -> Result<u64, StoreError>;

    async fn get(&self, kind: Kind, id: u64) -> Result<Option<String>, StoreError>;

    /// Overwrites the record at `id`.
    async fn put(&self, kind: Kind, id: u64, json: String) -> Result<(), StoreError>;

    /// All records of a kind, ordered by id.
    async fn list(&self, kind: Kind) -> Result<Vec<(u64, String)>, StoreError>;
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl Datastore for RedisStore {
    async fn insert(&self, kind: Kind, json: String) -> Result<u64, StoreError> {
        let mut connection = self.connection.clone();

        let id: u64 = connection.incr(kind.counter_key(), 1).await?;
        let _: () = connection.hset(kind.hash_key(), id, json).await?;

        debug!("Inserted {kind}/{id}");
        Ok(id)
    }

    async fn get(&self, kind: Kind, id: u64) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hget(kind.hash_key(), id).await?)
    }

    async fn put(&self, kind: Kind, id: u64, json: String) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        let _: () = connection.hset(kind.hash_key(), id, json).await?;
        Ok(())
    }

    async fn list(&self, kind: Kind) -> Result<Vec<(u64, String)>, StoreError> {
        let mut connection = self.connection.clone();

        let records: HashMap<u64, String> = connection.hgetall(kind.hash_key()).await?;
        let mut records: Vec<(u64, String)> = records.into_iter().collect();
        records.sort_unstable_by_key(|(id, _)| *id);

        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Kind, (u64, BTreeMap<u64, String>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn insert(&self, kind: Kind, json: String) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let (next_id, table) = records.entry(kind).or_default();

        *next_id += 1;
        table.insert(*next_id, json);

        Ok(*next_id)
    }

    async fn get(&self, kind: Kind, id: u64) -> Result<Option<String>, StoreError> {
        let records = self.records.read().await;

        Ok(records
            .get(&kind)
            .and_then(|(_, table)| table.get(&id))
            .cloned())
    }

    async fn put(&self, kind: Kind, id: u64, json: String) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let (next_id, table) = records.entry(kind).or_default();

        // keep the counter ahead of explicitly written ids, like INCR would be
        *next_id = (*next_id).max(id);
        table.insert(id, json);

        Ok(())
    }

    async fn list(&self, kind: Kind) -> Result<Vec<(u64, String)>, StoreError> {
        let records = self.records.read().await;

        Ok(records
            .get(&kind)
            .map(|(_, table)| table.iter().map(|(id, json)| (*id, json.clone())).collect())
            .unwrap_or_default())
    }
}

fn encode<T: serde::Serialize>(kind: Kind, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { kind, source })
}

pub async fn save_destination(
    store: &dyn Datastore,
    destination: &Destination,
) -> Result<u64, StoreError> {
    store
        .insert(Kind::Destination, encode(Kind::Destination, destination)?)
        .await
}

/// Records that no longer decode are skipped with a warning.
pub async fn load_destinations(store: &dyn Datastore) -> Result<Vec<Destination>, StoreError> {
    let records = store.list(Kind::Destination).await?;

    Ok(records
        .into_iter()
        .filter_map(|(id, json)| match serde_json::from_str(&json) {
            Ok(destination) => Some(destination),
            Err(e) => {
                warn!("Skipping undecodable destination {id}: {e}");
                None
            }
        })
        .collect())
}

pub async fn load_cities(store: &dyn Datastore) -> Result<BTreeSet<String>, StoreError> {
    Ok(load_destinations(store)
        .await?
        .into_iter()
        .map(|destination| destination.city)
        .collect())
}

pub async fn save_hunt(store: &dyn Datastore, hunt: &ScavengerHunt) -> Result<u64, StoreError> {
    store
        .insert(Kind::ScavengerHunt, encode(Kind::ScavengerHunt, hunt)?)
        .await
}

/// `None` for unknown ids and for blobs that no longer decode.
pub async fn load_hunt(store: &dyn Datastore, id: u64) -> Result<Option<ScavengerHunt>, StoreError> {
    let Some(json) = store.get(Kind::ScavengerHunt, id).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&json) {
        Ok(hunt) => Ok(Some(hunt)),
        Err(e) => {
            warn!("Undecodable hunt {id}: {e}");
            Ok(None)
        }
    }
}

pub async fn update_hunt(
    store: &dyn Datastore,
    id: u64,
    hunt: &ScavengerHunt,
) -> Result<(), StoreError> {
    store
        .put(Kind::ScavengerHunt, id, encode(Kind::ScavengerHunt, hunt)?)
        .await
}

pub fn is_duplicate(destinations: &[Destination], place_id: &str) -> bool {
    destinations
        .iter()
        .any(|destination| destination.place_id.as_deref() == Some(place_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LatLng, Obscurity};

    fn destination(name: &str, city: &str, place_id: Option<&str>) -> Destination {
        let builder = Destination::builder()
            .name(name)
            .city(city)
            .location(LatLng::new(0.0, 0.0))
            .obscurity(Obscurity::Medium);

        match place_id {
            Some(place_id) => builder.place_id(place_id).build(),
            None => builder.build(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_ids_per_kind() {
        let store = MemoryStore::new();

        assert_eq!(store.insert(Kind::Destination, "a".into()).await.unwrap(), 1);
        assert_eq!(store.insert(Kind::Destination, "b".into()).await.unwrap(), 2);
        assert_eq!(store.insert(Kind::ScavengerHunt, "c".into()).await.unwrap(), 1);

        assert_eq!(
            store.get(Kind::Destination, 2).await.unwrap(),
            Some("b".to_string())
        );
        assert_eq!(store.get(Kind::ScavengerHunt, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_put_overwrites() {
        let store = MemoryStore::new();
        let id = store.insert(Kind::ScavengerHunt, "old".into()).await.unwrap();

        store.put(Kind::ScavengerHunt, id, "new".into()).await.unwrap();

        assert_eq!(
            store.list(Kind::ScavengerHunt).await.unwrap(),
            vec![(id, "new".to_string())]
        );
    }

    #[tokio::test]
    async fn test_memory_store_put_advances_counter() {
        let store = MemoryStore::new();
        store.put(Kind::Destination, 7, "x".into()).await.unwrap();

        assert_eq!(store.insert(Kind::Destination, "y".into()).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_load_destinations_skips_garbage() {
        let store = MemoryStore::new();
        save_destination(&store, &destination("Louvre", "Paris", None))
            .await
            .unwrap();
        store
            .insert(Kind::Destination, "{not json".into())
            .await
            .unwrap();

        let destinations = load_destinations(&store).await.unwrap();
        assert_eq!(destinations.len(), 1);
        assert_eq!(destinations[0].name, "Louvre");
    }

    #[tokio::test]
    async fn test_load_cities_deduplicates() {
        let store = MemoryStore::new();
        for (name, city) in [
            ("Louvre", "Paris"),
            ("Golden Gate", "San Francisco"),
            ("Eiffel Tower", "Paris"),
        ] {
            save_destination(&store, &destination(name, city, None))
                .await
                .unwrap();
        }

        let cities: Vec<String> = load_cities(&store).await.unwrap().into_iter().collect();
        assert_eq!(cities, vec!["Paris", "San Francisco"]);
    }

    #[tokio::test]
    async fn test_hunt_round_trip_through_update() {
        let store = MemoryStore::new();
        let mut hunt = ScavengerHunt::new(
            vec![destination("Louvre", "Paris", None).to_hunt_item()],
            "Paris",
        );
        let id = save_hunt(&store, &hunt).await.unwrap();

        hunt.set_index(0).unwrap();
        update_hunt(&store, id, &hunt).await.unwrap();

        let loaded = load_hunt(&store, id).await.unwrap().unwrap();
        assert_eq!(loaded.index, 0);
        assert!(load_hunt(&store, id + 1).await.unwrap().is_none());
    }

    #[test]
    fn test_is_duplicate() {
        let destinations = vec![
            destination("Golden Gate", "San Francisco", Some("ChIJw____96GhYARCVVwg5cT7c0")),
            destination("Louvre", "Paris", None),
        ];

        assert!(is_duplicate(&destinations, "ChIJw____96GhYARCVVwg5cT7c0"));
        assert!(!is_duplicate(&destinations, "ChIJD7fiBh9u5kcRYJSMaMOCCwQ"));
        assert!(!is_duplicate(&[], "anything"));
    }
}
