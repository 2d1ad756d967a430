use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{
    config::{Config, StoreKind},
    database::{Datastore, MemoryStore, RedisStore},
    error::AppError,
    language::{EntityExtractor, LanguageClient, WordExtractor},
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn Datastore>,
    pub extractor: Arc<dyn EntityExtractor>,
    /// Serializes the duplicate check and insert of a submitted destination.
    pub submissions: Mutex<()>,
    /// Serializes load-modify-put of stored hunts.
    pub hunt_writes: Mutex<()>,
}

impl State {
    pub async fn new() -> Result<Arc<Self>, AppError> {
        let config = Config::load()?;

        let store: Arc<dyn Datastore> = match config.store {
            StoreKind::Redis => {
                info!("Connecting to Redis at {}", config.redis_url);
                Arc::new(RedisStore::connect(&config.redis_url).await?)
            }
            StoreKind::Memory => {
                warn!("Using in-memory store, nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
        };

        let extractor: Arc<dyn EntityExtractor> = match &config.language_key {
            Some(key) => Arc::new(LanguageClient::with_base_url(key, &config.language_url)),
            None => {
                warn!("No language API key, guesses are matched word by word");
                Arc::new(WordExtractor)
            }
        };

        Ok(Self::with_parts(config, store, extractor))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn Datastore>,
        extractor: Arc<dyn EntityExtractor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            extractor,
            submissions: Mutex::new(()),
            hunt_writes: Mutex::new(()),
        })
    }
}
