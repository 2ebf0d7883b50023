//! In-memory TTL cache shared by the query API and the scan pipeline
//!
//! Time-based eviction only; the key space is small (catalog × a
//! handful of timeframes) so no size cap is needed. Concurrent readers
//! may recompute the same key under a race; correctness does not
//! require single-flighting.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::types::TimeFrame;

/// Default entry lifetime (also used for the catalog snapshot)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Structured cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw candle + volume series for one (symbol, timeframe)
    Price { symbol: String, timeframe: TimeFrame },
    /// Precomputed indicator series; the multiplier is keyed by its bit
    /// pattern so the key stays Hash + Eq.
    Indicators {
        symbol: String,
        timeframe: TimeFrame,
        period: usize,
        multiplier_bits: u64,
    },
    /// Catalog snapshot capped at `limit`
    Top { limit: usize },
}

impl CacheKey {
    pub fn indicators(symbol: &str, timeframe: TimeFrame, period: usize, multiplier: f64) -> Self {
        CacheKey::Indicators {
            symbol: symbol.to_string(),
            timeframe,
            period,
            multiplier_bits: multiplier.to_bits(),
        }
    }

    pub fn price(symbol: &str, timeframe: TimeFrame) -> Self {
        CacheKey::Price {
            symbol: symbol.to_string(),
            timeframe,
        }
    }
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Concurrent TTL cache over immutable JSON payloads
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the value only if the entry has not expired.
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    /// Insert or replace, and opportunistically drop expired entries.
    pub async fn set(&self, key: CacheKey, value: serde_json::Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
