use dashmap::DashMap;
use sea_orm::{ConnectionTrait, DbErr};
use tracing::{debug, info};

use super::{MeasureMeta, load_meta};

/// Read-through cache of [`MeasureMeta`] keyed by `(objectId, token)`.
///
/// Misses are not cached, so a token created after a failed lookup works
/// right away.
#[derive(Default)]
pub struct MetadataCache {
    entries: DashMap<(i64, String), MeasureMeta>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load<C: ConnectionTrait>(
        &self,
        db: &C,
        object_id: i64,
        secret: &str,
    ) -> Result<Option<MeasureMeta>, DbErr> {
        let key = (object_id, secret.to_string());
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Some(hit.clone()));
        }
        let loaded = load_meta(db, object_id, secret).await?;
        if let Some(meta) = &loaded {
            debug!(object_id, "Caching measure metadata");
            self.entries.insert(key, meta.clone());
        }
        Ok(loaded)
    }

    pub fn clear(&self) {
        let evicted = self.entries.len();
        self.entries.clear();
        info!(evicted, "Evicted measure metadata cache");
    }
}
