//! In-process counter backend on DashMap, lock-free for concurrent
//! increments from parallel recording requests.

use std::sync::atomic::{AtomicU64, Ordering};

use adpulse_core::error::MissingCounter;
use adpulse_core::types::CounterKind;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct CounterPair {
    impressions: AtomicU64,
    clicks: AtomicU64,
}

impl CounterPair {
    fn of(&self, kind: CounterKind) -> &AtomicU64 {
        match kind {
            CounterKind::Impressions => &self.impressions,
            CounterKind::Clicks => &self.clicks,
        }
    }
}

/// Default [`CounterCache`](crate::CounterCache) backend.
#[derive(Debug, Default)]
pub struct LocalCounterCache {
    entries: DashMap<Uuid, CounterPair>,
}

impl LocalCounterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl crate::CounterCache for LocalCounterCache {
    fn ensure_initialized(&self, campaign_id: Uuid, impressions: u64, clicks: u64) {
        // Create-if-absent then overwrite: the entry ends up holding the
        // ledger-derived values even when another worker raced the insert.
        let entry = self.entries.entry(campaign_id).or_default();
        entry.impressions.store(impressions, Ordering::SeqCst);
        entry.clicks.store(clicks, Ordering::SeqCst);
        debug!(
            campaign_id = %campaign_id,
            impressions,
            clicks,
            "Usage counters initialized"
        );
    }

    fn increment(&self, campaign_id: Uuid, kind: CounterKind) -> Result<u64, MissingCounter> {
        match self.entries.get(&campaign_id) {
            Some(entry) => {
                metrics::counter!("adpulse.counters.hit").increment(1);
                Ok(entry.of(kind).fetch_add(1, Ordering::SeqCst) + 1)
            }
            None => {
                metrics::counter!("adpulse.counters.miss").increment(1);
                Err(MissingCounter { campaign_id, kind })
            }
        }
    }

    fn read(&self, campaign_id: Uuid, kind: CounterKind) -> u64 {
        self.entries
            .get(&campaign_id)
            .map(|entry| entry.of(kind).load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn remove(&self, campaign_id: Uuid) {
        self.entries.remove(&campaign_id);
    }
}
