use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::model::geo_zone::GeoZone;
use crate::repository::{StoreError, ZoneRepository};

/// Zones change rarely but are read on every check-in/out, so the active
/// set is kept in memory for `ttl`. Edits show up once the entry expires.
pub struct CachedZoneRepository {
    inner: Arc<dyn ZoneRepository>,
    cache: Cache<(), Arc<Vec<GeoZone>>>,
}

impl CachedZoneRepository {
    pub fn new(inner: Arc<dyn ZoneRepository>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl ZoneRepository for CachedZoneRepository {
    async fn list_active(&self) -> Result<Vec<GeoZone>, StoreError> {
        if let Some(zones) = self.cache.get(&()).await {
            return Ok(zones.as_ref().clone());
        }

        let zones = self.inner.list_active().await?;
        tracing::debug!(count = zones.len(), "Zone cache refreshed");

        // an empty set is not cached, so the first zone an admin adds is picked up at once
        if !zones.is_empty() {
            self.cache.insert((), Arc::new(zones.clone())).await;
        }
        Ok(zones)
    }
}
