//! In-memory campaign store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface — including write-time uniqueness
//! enforcement — for development and testing.

use std::collections::HashMap;

use adpulse_core::error::{AdError, AdResult};
use adpulse_core::types::{
    Advertiser, Campaign, CampaignDraft, Client, Mlscore, Report, ReportState,
};
use adpulse_core::validation::{validate_campaign_draft, MAX_AGE};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::ledger::Ledger;

/// Fields that lock down once a campaign has started.
const LOCKED_AFTER_START: &str = "impressions_limit, clicks_limit, start_date, end_date";

/// Thread-safe store for advertisers, clients, campaigns, ML scores,
/// delivery facts, and reports.
pub struct AdStore {
    advertisers: DashMap<Uuid, Advertiser>,
    clients: DashMap<Uuid, Client>,
    campaigns: DashMap<Uuid, Campaign>,
    /// (advertiser, client) -> score.
    mlscores: DashMap<(Uuid, Uuid), u64>,
    reports: DashMap<Uuid, Report>,
    /// (campaign, client) -> report id; backs the one-report-per-pair rule.
    report_index: DashMap<(Uuid, Uuid), Uuid>,
    ledger: Ledger,
}

impl AdStore {
    pub fn new() -> Self {
        Self {
            advertisers: DashMap::new(),
            clients: DashMap::new(),
            campaigns: DashMap::new(),
            mlscores: DashMap::new(),
            reports: DashMap::new(),
            report_index: DashMap::new(),
            ledger: Ledger::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ─── Advertisers / Clients ─────────────────────────────────────────────

    /// Create-or-update a batch of advertisers. When an id repeats within the
    /// batch, the last occurrence wins; the returned list keeps one entry per
    /// id in first-occurrence order.
    pub fn upsert_advertisers(&self, batch: Vec<Advertiser>) -> AdResult<Vec<Advertiser>> {
        for advertiser in &batch {
            if advertiser.name.trim().is_empty() {
                return Err(AdError::Validation("advertiser name cannot be blank".into()));
            }
        }

        let mut ids = Vec::new();
        for advertiser in batch {
            if !ids.contains(&advertiser.id) {
                ids.push(advertiser.id);
            }
            self.advertisers.insert(advertiser.id, advertiser);
        }
        Ok(ids
            .into_iter()
            .filter_map(|id| self.advertisers.get(&id).map(|r| r.value().clone()))
            .collect())
    }

    pub fn get_advertiser(&self, advertiser_id: Uuid) -> AdResult<Advertiser> {
        self.advertisers
            .get(&advertiser_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| AdError::not_found("advertiser", advertiser_id))
    }

    /// Create-or-update a batch of clients, last occurrence per id winning.
    pub fn upsert_clients(&self, batch: Vec<Client>) -> AdResult<Vec<Client>> {
        for client in &batch {
            if client.login.trim().is_empty() {
                return Err(AdError::Validation("client login cannot be blank".into()));
            }
            if client.age > MAX_AGE {
                return Err(AdError::Validation(format!(
                    "client age must be within 0..={MAX_AGE}"
                )));
            }
        }

        let mut ids = Vec::new();
        for client in batch {
            if !ids.contains(&client.id) {
                ids.push(client.id);
            }
            self.clients.insert(client.id, client);
        }
        Ok(ids
            .into_iter()
            .filter_map(|id| self.clients.get(&id).map(|r| r.value().clone()))
            .collect())
    }

    pub fn get_client(&self, client_id: Uuid) -> AdResult<Client> {
        self.clients
            .get(&client_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| AdError::not_found("client", client_id))
    }

    // ─── ML scores ─────────────────────────────────────────────────────────

    /// Upsert the affinity score for an (advertiser, client) pair.
    pub fn set_mlscore(&self, advertiser_id: Uuid, client_id: Uuid, score: u64) -> AdResult<Mlscore> {
        if !self.advertisers.contains_key(&advertiser_id) {
            return Err(AdError::not_found("advertiser", advertiser_id));
        }
        if !self.clients.contains_key(&client_id) {
            return Err(AdError::not_found("client", client_id));
        }
        self.mlscores.insert((advertiser_id, client_id), score);
        Ok(Mlscore {
            advertiser_id,
            client_id,
            score,
        })
    }

    /// Score for one pair, 0 when absent.
    pub fn mlscore(&self, advertiser_id: Uuid, client_id: Uuid) -> u64 {
        self.mlscores
            .get(&(advertiser_id, client_id))
            .map(|r| *r.value())
            .unwrap_or(0)
    }

    /// Batched score lookup for one client across many advertisers.
    /// Absent pairs are simply missing from the map (callers default to 0).
    pub fn mlscores_for_client(
        &self,
        client_id: Uuid,
        advertiser_ids: &[Uuid],
    ) -> HashMap<Uuid, u64> {
        advertiser_ids
            .iter()
            .filter_map(|&advertiser_id| {
                self.mlscores
                    .get(&(advertiser_id, client_id))
                    .map(|r| (advertiser_id, *r.value()))
            })
            .collect()
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    /// Create a campaign for the advertiser. `today` is the caller's one
    /// clock read for the whole operation.
    pub fn create_campaign(
        &self,
        advertiser_id: Uuid,
        draft: CampaignDraft,
        today: u32,
    ) -> AdResult<Campaign> {
        validate_campaign_draft(&draft)?;
        if !self.advertisers.contains_key(&advertiser_id) {
            return Err(AdError::not_found("advertiser", advertiser_id));
        }
        if draft.start_date < today {
            return Err(AdError::Validation(
                "start_date can't be before the current date".into(),
            ));
        }

        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            advertiser_id,
            impressions_limit: draft.impressions_limit,
            clicks_limit: draft.clicks_limit,
            cost_per_impression: draft.cost_per_impression,
            cost_per_click: draft.cost_per_click,
            ad_title: draft.ad_title,
            ad_text: draft.ad_text,
            ad_image: None,
            start_date: draft.start_date,
            end_date: draft.end_date,
            targeting: draft.targeting,
            created_at: now,
            updated_at: now,
        };
        let id = campaign.id;
        self.campaigns.insert(id, campaign.clone());
        info!(campaign_id = %id, advertiser_id = %advertiser_id, "Campaign created");
        Ok(campaign)
    }

    pub fn get_campaign(&self, campaign_id: Uuid) -> AdResult<Campaign> {
        self.campaigns
            .get(&campaign_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| AdError::not_found("campaign", campaign_id))
    }

    /// Like [`get_campaign`](Self::get_campaign) but scoped to the owning
    /// advertiser; a foreign campaign id reads as not-found.
    pub fn get_campaign_scoped(&self, advertiser_id: Uuid, campaign_id: Uuid) -> AdResult<Campaign> {
        self.campaigns
            .get(&campaign_id)
            .filter(|r| r.value().advertiser_id == advertiser_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| AdError::not_found("campaign", campaign_id))
    }

    /// Advertiser's campaigns, newest end date first, 1-based pagination.
    pub fn list_campaigns(
        &self,
        advertiser_id: Uuid,
        page: usize,
        size: usize,
    ) -> AdResult<Vec<Campaign>> {
        if page == 0 {
            return Err(AdError::Validation("page numbering starts at 1".into()));
        }
        if !self.advertisers.contains_key(&advertiser_id) {
            return Err(AdError::not_found("advertiser", advertiser_id));
        }

        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|r| r.value().advertiser_id == advertiser_id)
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.end_date.cmp(&a.end_date).then(a.id.cmp(&b.id)));
        Ok(campaigns
            .into_iter()
            .skip((page - 1) * size)
            .take(size)
            .collect())
    }

    /// Full-replace update. Once the campaign has started, limits and the
    /// schedule are locked; changing any of them is forbidden.
    pub fn update_campaign(
        &self,
        advertiser_id: Uuid,
        campaign_id: Uuid,
        draft: CampaignDraft,
        today: u32,
    ) -> AdResult<Campaign> {
        validate_campaign_draft(&draft)?;

        let mut entry = self
            .campaigns
            .get_mut(&campaign_id)
            .filter(|entry| entry.value().advertiser_id == advertiser_id)
            .ok_or_else(|| AdError::not_found("campaign", campaign_id))?;
        let campaign = entry.value_mut();

        if campaign.started(today) {
            let locked_changed = draft.impressions_limit != campaign.impressions_limit
                || draft.clicks_limit != campaign.clicks_limit
                || draft.start_date != campaign.start_date
                || draft.end_date != campaign.end_date;
            if locked_changed {
                return Err(AdError::Forbidden(format!(
                    "{LOCKED_AFTER_START} are locked once the campaign has started"
                )));
            }
        } else if draft.start_date != campaign.start_date && draft.start_date < today {
            return Err(AdError::Validation(
                "start_date can't be before the current date".into(),
            ));
        }

        campaign.impressions_limit = draft.impressions_limit;
        campaign.clicks_limit = draft.clicks_limit;
        campaign.cost_per_impression = draft.cost_per_impression;
        campaign.cost_per_click = draft.cost_per_click;
        campaign.ad_title = draft.ad_title;
        campaign.ad_text = draft.ad_text;
        campaign.start_date = draft.start_date;
        campaign.end_date = draft.end_date;
        campaign.targeting = draft.targeting;
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    /// Delete the campaign, cascading its facts and detaching its reports.
    /// The creative image goes with the entity. Returns the removed campaign
    /// so callers can evict derived state (usage counters).
    pub fn delete_campaign(&self, advertiser_id: Uuid, campaign_id: Uuid) -> AdResult<Campaign> {
        let (_, campaign) = self
            .campaigns
            .remove_if(&campaign_id, |_, campaign| {
                campaign.advertiser_id == advertiser_id
            })
            .ok_or_else(|| AdError::not_found("campaign", campaign_id))?;

        self.ledger.remove_campaign(campaign_id);
        self.report_index.retain(|key, _| key.0 != campaign_id);
        for mut report in self.reports.iter_mut() {
            if report.campaign_id == Some(campaign_id) {
                report.campaign_id = None;
            }
        }
        info!(campaign_id = %campaign_id, "Campaign deleted");
        Ok(campaign)
    }

    /// Attach a creative image reference, overwriting any previous one.
    pub fn set_ad_image(
        &self,
        advertiser_id: Uuid,
        campaign_id: Uuid,
        image: String,
    ) -> AdResult<Campaign> {
        if image.trim().is_empty() {
            return Err(AdError::Validation("ad_image cannot be blank".into()));
        }
        let mut entry = self
            .campaigns
            .get_mut(&campaign_id)
            .filter(|entry| entry.value().advertiser_id == advertiser_id)
            .ok_or_else(|| AdError::not_found("campaign", campaign_id))?;
        let campaign = entry.value_mut();
        campaign.ad_image = Some(image);
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    pub fn clear_ad_image(&self, advertiser_id: Uuid, campaign_id: Uuid) -> AdResult<Campaign> {
        let mut entry = self
            .campaigns
            .get_mut(&campaign_id)
            .filter(|entry| entry.value().advertiser_id == advertiser_id)
            .ok_or_else(|| AdError::not_found("campaign", campaign_id))?;
        let campaign = entry.value_mut();
        campaign.ad_image = None;
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    /// Campaigns matching `predicate`, capped at `limit`. The selection path
    /// uses this as its one bounded read of the campaign table.
    pub fn select_campaigns<F>(&self, predicate: F, limit: usize) -> Vec<Campaign>
    where
        F: Fn(&Campaign) -> bool,
    {
        self.campaigns
            .iter()
            .filter(|r| predicate(r.value()))
            .take(limit)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Every campaign id currently stored (counter warm-up).
    pub fn campaign_ids(&self) -> Vec<Uuid> {
        self.campaigns.iter().map(|r| *r.key()).collect()
    }

    pub fn campaigns_for_advertiser(&self, advertiser_id: Uuid) -> Vec<Campaign> {
        self.campaigns
            .iter()
            .filter(|r| r.value().advertiser_id == advertiser_id)
            .map(|r| r.value().clone())
            .collect()
    }

    // ─── Reports ───────────────────────────────────────────────────────────

    /// Submit a complaint about a campaign this client was shown.
    /// One report per (campaign, client); duplicates surface as conflicts.
    pub fn submit_report(
        &self,
        campaign_id: Uuid,
        client_id: Uuid,
        message: String,
    ) -> AdResult<Report> {
        if !self.campaigns.contains_key(&campaign_id) {
            return Err(AdError::not_found("campaign", campaign_id));
        }
        if !self.clients.contains_key(&client_id) {
            return Err(AdError::not_found("client", client_id));
        }
        if message.trim().is_empty() {
            return Err(AdError::Validation("message cannot be blank".into()));
        }
        if !self.ledger.has_impression(campaign_id, client_id) {
            return Err(AdError::Forbidden(
                "can't report a campaign that was never shown to this client".into(),
            ));
        }

        match self.report_index.entry((campaign_id, client_id)) {
            Entry::Occupied(_) => Err(AdError::Conflict(format!(
                "report already submitted for campaign {campaign_id} by client {client_id}"
            ))),
            Entry::Vacant(slot) => {
                let report = Report {
                    id: Uuid::new_v4(),
                    campaign_id: Some(campaign_id),
                    client_id: Some(client_id),
                    message,
                    state: ReportState::Sent,
                    flagged: None,
                    submitted_at: Utc::now(),
                };
                slot.insert(report.id);
                self.reports.insert(report.id, report.clone());
                Ok(report)
            }
        }
    }

    pub fn set_report_state(&self, report_id: Uuid, state: ReportState) -> AdResult<Report> {
        let mut entry = self
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| AdError::not_found("report", report_id))?;
        entry.value_mut().state = state;
        Ok(entry.value().clone())
    }

    /// Record the moderation verdict produced by an external reviewer.
    pub fn set_report_flag(&self, report_id: Uuid, flagged: bool) -> AdResult<Report> {
        let mut entry = self
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| AdError::not_found("report", report_id))?;
        entry.value_mut().flagged = Some(flagged);
        Ok(entry.value().clone())
    }

    pub fn reports_for_campaign(&self, campaign_id: Uuid) -> Vec<Report> {
        let mut reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| r.value().campaign_id == Some(campaign_id))
            .map(|r| r.value().clone())
            .collect();
        reports.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        reports
    }
}

impl Default for AdStore {
    fn default() -> Self {
        Self::new()
    }
}
