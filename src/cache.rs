// Caching mechanism for mirroring the committed exchange rate locally.
//
// The committed rate is re-read by other screens (billing previews, the
// consultation form) while offline, so every successful rate commit is
// mirrored here in plain decimal form.
use crate::context::AppContext;
use crate::storage::LocalStorage;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

// Increment this whenever the cached shape changes to invalidate old caches.
const CACHE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct RateCacheData {
    // If this field is missing in the JSON (old cache), it defaults to 0.
    #[serde(default)]
    version: u32,
    value: String,
}

pub struct RateCache;

impl RateCache {
    pub fn save(ctx: &dyn AppContext, value: &str) -> Result<()> {
        if let Some(path) = ctx.get_rate_cache_path() {
            LocalStorage::with_lock(&path, || {
                let data = RateCacheData {
                    version: CACHE_VERSION,
                    value: value.to_string(),
                };
                let json = serde_json::to_string_pretty(&data)?;
                LocalStorage::atomic_write(&path, json)?;
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Returns the mirrored rate, or `None` when nothing valid is cached.
    pub fn load(ctx: &dyn AppContext) -> Result<Option<String>> {
        if let Some(path) = ctx.get_rate_cache_path()
            && path.exists()
        {
            return LocalStorage::with_lock(&path, || {
                let json = fs::read_to_string(&path)?;
                if let Ok(cache) = serde_json::from_str::<RateCacheData>(&json)
                    && cache.version == CACHE_VERSION
                {
                    return Ok(Some(cache.value));
                }
                // Version mismatch or parse error: treat the cache as absent.
                Ok(None)
            });
        }
        Ok(None)
    }
}
