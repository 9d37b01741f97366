//! Delivery engine — ties the store, the ledger, the usage counters, and the
//! clock into the `suggest` / `record_view` / `record_click` contract.

use std::sync::Arc;

use adpulse_cache::CounterCache;
use adpulse_core::clock::ClockSource;
use adpulse_core::config::{AppConfig, OverrunConfig, RankingConfig};
use adpulse_core::error::{AdError, AdResult};
use adpulse_core::types::{AdFact, Campaign, CounterKind};
use adpulse_store::AdStore;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::eligibility;
use crate::ranking;

/// Knobs of the selection path. See the config crate docs for the history of
/// the weight set and the overrun policy.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryConfig {
    pub ranking: RankingConfig,
    pub overrun: OverrunConfig,
    /// Cap on candidates fetched per selection request.
    pub candidate_limit: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DeliveryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            ranking: config.ranking,
            overrun: config.overrun,
            candidate_limit: config.selection.candidate_limit,
        }
    }
}

/// Per-request ad selection and delivery recording.
///
/// Selection is a pure computation over one batched read of the store; it
/// performs no writes, so `suggest` is safe to repeat. Recording goes through
/// the ledger first (the uniqueness constraint is the correctness mechanism)
/// and only then touches the fast-path counters.
pub struct DeliveryEngine {
    store: Arc<AdStore>,
    counters: Arc<dyn CounterCache>,
    clock: Arc<dyn ClockSource>,
    config: DeliveryConfig,
}

impl DeliveryEngine {
    pub fn new(
        store: Arc<AdStore>,
        counters: Arc<dyn CounterCache>,
        clock: Arc<dyn ClockSource>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            counters,
            clock,
            config,
        }
    }

    /// Pick the best campaign for this client, or `None` when no eligible
    /// candidate survives filtering. Never records anything.
    pub fn suggest(&self, client_id: Uuid) -> AdResult<Option<Campaign>> {
        let client = self.store.get_client(client_id)?;
        let today = self.clock.current_date();

        let candidates = self.store.select_campaigns(
            |campaign| eligibility::is_eligible(campaign, &client, today),
            self.config.candidate_limit,
        );
        if candidates.is_empty() {
            return Ok(None);
        }

        // One batched read each for affinity scores and the client's history.
        let mut advertiser_ids: Vec<Uuid> =
            candidates.iter().map(|c| c.advertiser_id).collect();
        advertiser_ids.sort_unstable();
        advertiser_ids.dedup();
        let scores = self.store.mlscores_for_client(client_id, &advertiser_ids);

        let campaign_ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
        let ledger = self.store.ledger();
        let impressed = ledger.impressed_campaigns(client_id, &campaign_ids);
        let clicked = ledger.clicked_campaigns(client_id, &campaign_ids);

        let mut signals = Vec::with_capacity(candidates.len());
        for campaign in &candidates {
            let has_impression = impressed.contains(&campaign.id);
            let served = self.counters.read(campaign.id, CounterKind::Impressions);

            // Soft budget cap only applies while a first impression is still
            // billable for this client.
            if !has_impression {
                let overrun_granted = eligibility::draw_overrun(&self.config.overrun);
                if !eligibility::passes_budget(
                    served,
                    campaign.impressions_limit,
                    &self.config.overrun,
                    overrun_granted,
                ) {
                    continue;
                }
            }

            let ml_score = scores.get(&campaign.advertiser_id).copied().unwrap_or(0);
            if let Some(sig) = ranking::build_signals(
                campaign,
                ml_score,
                served,
                has_impression,
                clicked.contains(&campaign.id),
            ) {
                signals.push(sig);
            }
        }

        let winner = ranking::select_winner(&signals, &self.config.ranking);
        Ok(winner.and_then(|id| candidates.into_iter().find(|c| c.id == id)))
    }

    /// Record one impression. Safe to call repeatedly: a duplicate is a
    /// silent no-op and neither the ledger nor the counters change.
    pub fn record_view(&self, campaign_id: Uuid, client_id: Uuid) -> AdResult<()> {
        self.store.get_client(client_id)?;
        let campaign = self.store.get_campaign(campaign_id)?;
        let today = self.clock.current_date();

        let fact = AdFact {
            campaign_id,
            client_id,
            price: campaign.cost_per_impression,
            date: today,
        };
        match self.store.ledger().record_impression(fact) {
            Ok(()) => self.bump_counter(campaign_id, CounterKind::Impressions),
            Err(AdError::Conflict(_)) => {
                debug!(
                    campaign_id = %campaign_id,
                    client_id = %client_id,
                    "Duplicate impression ignored"
                );
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// Record one click. Requires the campaign to be active and the client
    /// to have a recorded impression; both are re-checked on every call.
    /// A duplicate click is a silent no-op.
    pub fn record_click(&self, campaign_id: Uuid, client_id: Uuid) -> AdResult<()> {
        self.store.get_client(client_id)?;
        let campaign = self.store.get_campaign(campaign_id)?;
        let today = self.clock.current_date();

        if !campaign.active(today) {
            return Err(AdError::Forbidden(
                "can't click on an inactive campaign".into(),
            ));
        }
        if !self.store.ledger().has_impression(campaign_id, client_id) {
            return Err(AdError::Forbidden(
                "can't click on a campaign without a prior impression".into(),
            ));
        }

        let fact = AdFact {
            campaign_id,
            client_id,
            price: campaign.cost_per_click,
            date: today,
        };
        match self.store.ledger().record_click(fact) {
            Ok(()) => self.bump_counter(campaign_id, CounterKind::Clicks),
            Err(AdError::Conflict(_)) => {
                debug!(
                    campaign_id = %campaign_id,
                    client_id = %client_id,
                    "Duplicate click ignored"
                );
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// Initialize the usage counters for every stored campaign from ledger
    /// truth (startup warm-up; also the admin re-sync path).
    pub fn warm_counters(&self) {
        for campaign_id in self.store.campaign_ids() {
            let totals = self.store.ledger().totals(campaign_id);
            self.counters.ensure_initialized(
                campaign_id,
                totals.impressions_count,
                totals.clicks_count,
            );
        }
    }

    /// Delete a campaign and evict its counters along with the store-side
    /// cascade.
    pub fn delete_campaign(&self, advertiser_id: Uuid, campaign_id: Uuid) -> AdResult<Campaign> {
        let campaign = self.store.delete_campaign(advertiser_id, campaign_id)?;
        self.counters.remove(campaign_id);
        Ok(campaign)
    }

    /// Increment a usage counter after a successful ledger insert. A missing
    /// key (evicted, never warmed) is healed by re-initializing both counters
    /// from ledger truth instead of retrying the increment. A heal racing
    /// concurrent recorders may briefly undercount; that is accepted and
    /// logged, and any ledger aggregation sees the true value.
    fn bump_counter(&self, campaign_id: Uuid, kind: CounterKind) {
        if self.counters.increment(campaign_id, kind).is_err() {
            let totals = self.store.ledger().totals(campaign_id);
            self.counters.ensure_initialized(
                campaign_id,
                totals.impressions_count,
                totals.clicks_count,
            );
            warn!(
                campaign_id = %campaign_id,
                counter = %kind,
                "Usage counter was missing on increment; reinitialized from ledger"
            );
        }
    }
}
