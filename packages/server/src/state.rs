use std::sync::Arc;

use bbdata_common::DateConfig;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::ingest::{LogSink, MetadataCache, ValueSink};
use crate::stats::{self, StatsDispatcher};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub dates: Arc<DateConfig>,
    pub stats: StatsDispatcher,
    /// Present when `input.cache_enabled`.
    pub meta_cache: Option<Arc<MetadataCache>>,
    pub sink: Arc<dyn ValueSink>,
}

impl AppState {
    /// Wire the stats backend, dispatcher and cache selected by `config`.
    ///
    /// Must run inside a tokio runtime when the async stats pool is enabled.
    pub fn new(db: DatabaseConnection, config: AppConfig, dates: DateConfig) -> Self {
        let engine = stats::build(config.stats.backend, db.clone());
        let stats = if config.stats.async_enabled {
            StatsDispatcher::pooled(engine, config.stats.pool_size, config.stats.queue_capacity)
        } else {
            StatsDispatcher::inline(engine)
        };
        let meta_cache = config
            .input
            .cache_enabled
            .then(|| Arc::new(MetadataCache::new()));

        Self {
            db,
            config: Arc::new(config),
            dates: Arc::new(dates),
            stats,
            meta_cache,
            sink: Arc::new(LogSink),
        }
    }
}
