//! Impression/click ledger.
//!
//! One fact of each kind per (campaign, client) pair, ever. The per-key
//! insert-if-absent below is the only concurrency mechanism backing that
//! guarantee: when two workers race the same pair, exactly one insert lands
//! and the loser gets a conflict.

use std::collections::{BTreeMap, HashSet};

use adpulse_core::error::{AdError, AdResult};
use adpulse_core::types::AdFact;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

type PairKey = (Uuid, Uuid);

/// Delivery fact store, keyed by (campaign, client).
#[derive(Debug, Default)]
pub struct Ledger {
    impressions: DashMap<PairKey, AdFact>,
    clicks: DashMap<PairKey, AdFact>,
}

/// Authoritative per-campaign totals, computed by aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerTotals {
    pub impressions_count: u64,
    pub clicks_count: u64,
    pub spent_impressions: f64,
    pub spent_clicks: f64,
}

/// Per-day slice of [`LedgerTotals`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTotals {
    pub impressions_count: u64,
    pub clicks_count: u64,
    pub spent_impressions: f64,
    pub spent_clicks: f64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an impression fact. Conflict when the pair already has one.
    pub fn record_impression(&self, fact: AdFact) -> AdResult<()> {
        Self::insert_fact(&self.impressions, fact, "impression")
    }

    /// Insert a click fact. Conflict when the pair already has one.
    pub fn record_click(&self, fact: AdFact) -> AdResult<()> {
        Self::insert_fact(&self.clicks, fact, "click")
    }

    fn insert_fact(map: &DashMap<PairKey, AdFact>, fact: AdFact, kind: &str) -> AdResult<()> {
        match map.entry((fact.campaign_id, fact.client_id)) {
            Entry::Occupied(_) => Err(AdError::Conflict(format!(
                "{kind} already recorded for campaign {} by client {}",
                fact.campaign_id, fact.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(fact);
                Ok(())
            }
        }
    }

    pub fn has_impression(&self, campaign_id: Uuid, client_id: Uuid) -> bool {
        self.impressions.contains_key(&(campaign_id, client_id))
    }

    pub fn has_click(&self, campaign_id: Uuid, client_id: Uuid) -> bool {
        self.clicks.contains_key(&(campaign_id, client_id))
    }

    /// Of `campaign_ids`, the subset this client has an impression for.
    /// One pass of point lookups, so selection never queries per candidate.
    pub fn impressed_campaigns(&self, client_id: Uuid, campaign_ids: &[Uuid]) -> HashSet<Uuid> {
        campaign_ids
            .iter()
            .copied()
            .filter(|&campaign_id| self.has_impression(campaign_id, client_id))
            .collect()
    }

    /// Of `campaign_ids`, the subset this client has a click for.
    pub fn clicked_campaigns(&self, client_id: Uuid, campaign_ids: &[Uuid]) -> HashSet<Uuid> {
        campaign_ids
            .iter()
            .copied()
            .filter(|&campaign_id| self.has_click(campaign_id, client_id))
            .collect()
    }

    pub fn impression_count(&self, campaign_id: Uuid) -> u64 {
        self.impressions
            .iter()
            .filter(|r| r.key().0 == campaign_id)
            .count() as u64
    }

    pub fn click_count(&self, campaign_id: Uuid) -> u64 {
        self.clicks
            .iter()
            .filter(|r| r.key().0 == campaign_id)
            .count() as u64
    }

    /// Count-and-sum aggregate over both fact kinds for one campaign.
    pub fn totals(&self, campaign_id: Uuid) -> LedgerTotals {
        let mut totals = LedgerTotals::default();
        for r in self.impressions.iter().filter(|r| r.key().0 == campaign_id) {
            totals.impressions_count += 1;
            totals.spent_impressions += r.value().price;
        }
        for r in self.clicks.iter().filter(|r| r.key().0 == campaign_id) {
            totals.clicks_count += 1;
            totals.spent_clicks += r.value().price;
        }
        totals
    }

    /// Per-day aggregates for one campaign, keyed by simulated day.
    /// Only days with at least one fact appear; callers zero-fill gaps.
    pub fn daily_totals(&self, campaign_id: Uuid) -> BTreeMap<u32, DayTotals> {
        let mut days: BTreeMap<u32, DayTotals> = BTreeMap::new();
        for r in self.impressions.iter().filter(|r| r.key().0 == campaign_id) {
            let day = days.entry(r.value().date).or_default();
            day.impressions_count += 1;
            day.spent_impressions += r.value().price;
        }
        for r in self.clicks.iter().filter(|r| r.key().0 == campaign_id) {
            let day = days.entry(r.value().date).or_default();
            day.clicks_count += 1;
            day.spent_clicks += r.value().price;
        }
        days
    }

    /// Day of the campaign's most recent click, if any.
    pub fn last_click_date(&self, campaign_id: Uuid) -> Option<u32> {
        self.clicks
            .iter()
            .filter(|r| r.key().0 == campaign_id)
            .map(|r| r.value().date)
            .max()
    }

    /// Drop every fact belonging to the campaign (cascade on delete).
    pub fn remove_campaign(&self, campaign_id: Uuid) {
        self.impressions.retain(|key, _| key.0 != campaign_id);
        self.clicks.retain(|key, _| key.0 != campaign_id);
    }
}
