//! Usage-counter cache interface.
//!
//! Per campaign, two independent atomic counters track impressions-served and
//! clicks-served so budget checks never run a counting query against the
//! ledger on the hot path. The trade-off is an eventual-consistency window on
//! eviction, which callers recover from explicitly (see `increment`).

use adpulse_core::error::MissingCounter;
use adpulse_core::types::CounterKind;
use uuid::Uuid;

/// Fast per-campaign delivery counters. The ranking and recording paths only
/// ever talk to this trait; the backing store (in-process map, external KV)
/// is swappable.
pub trait CounterCache: Send + Sync {
    /// Create the campaign's counters if absent, then overwrite both with the
    /// given ledger-derived values. Idempotent; the stored values always
    /// reflect ledger truth as of the call.
    fn ensure_initialized(&self, campaign_id: Uuid, impressions: u64, clicks: u64);

    /// Atomically add 1 and return the new value. Fails with
    /// [`MissingCounter`] when the key is absent (evicted or never
    /// initialized); the caller re-initializes from the ledger, logs a
    /// warning, and drops the increment for that one event.
    fn increment(&self, campaign_id: Uuid, kind: CounterKind) -> Result<u64, MissingCounter>;

    /// Current value, 0 when the key is absent. Read paths that must not
    /// force initialization (budget pre-filtering) use this soft default.
    fn read(&self, campaign_id: Uuid, kind: CounterKind) -> u64;

    /// Drop both counters for the campaign.
    fn remove(&self, campaign_id: Uuid);
}
