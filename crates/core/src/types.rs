//! Domain types — advertisers, clients, campaigns, delivery facts, reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Advertiser / Client ───────────────────────────────────────────────────

/// An advertiser account. Owns campaigns and ML affinity scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advertiser {
    pub id: Uuid,
    pub name: String,
}

/// An end user ads are delivered to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub login: String,
    /// 0..=100.
    pub age: u8,
    pub location: String,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

/// Predicted (advertiser, client) affinity, used as a ranking signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlscore {
    pub advertiser_id: Uuid,
    pub client_id: Uuid,
    pub score: u64,
}

// ─── Campaign ──────────────────────────────────────────────────────────────

/// An advertiser's ad unit with budget, creative, schedule, and targeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub impressions_limit: u64,
    pub clicks_limit: u64,
    pub cost_per_impression: f64,
    pub cost_per_click: f64,
    pub ad_title: String,
    pub ad_text: String,
    /// Asset reference for the creative image, if one was attached.
    pub ad_image: Option<String>,
    /// Inclusive simulated-day window the campaign may serve in.
    pub start_date: u32,
    pub end_date: u32,
    #[serde(default)]
    pub targeting: Targeting,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Whether the campaign has started relative to the given day.
    /// Budget limits and the schedule lock down once this is true.
    pub fn started(&self, today: u32) -> bool {
        self.start_date <= today
    }

    /// Whether the campaign may serve on the given day.
    pub fn active(&self, today: u32) -> bool {
        self.start_date <= today && today <= self.end_date
    }
}

/// Optional audience constraints. Absent fields match every client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Targeting {
    #[serde(default)]
    pub gender: Option<TargetGender>,
    #[serde(default)]
    pub age_from: Option<u8>,
    #[serde(default)]
    pub age_to: Option<u8>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetGender {
    Male,
    Female,
    All,
}

impl TargetGender {
    pub fn matches(self, gender: Gender) -> bool {
        match self {
            TargetGender::All => true,
            TargetGender::Male => gender == Gender::Male,
            TargetGender::Female => gender == Gender::Female,
        }
    }
}

/// Mutable campaign fields as submitted on create and update.
/// Updates are full-replace: every field is supplied each time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub impressions_limit: u64,
    pub clicks_limit: u64,
    pub cost_per_impression: f64,
    pub cost_per_click: f64,
    pub ad_title: String,
    pub ad_text: String,
    pub start_date: u32,
    pub end_date: u32,
    #[serde(default)]
    pub targeting: Targeting,
}

/// The client-facing projection of a served campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub ad_id: Uuid,
    pub ad_title: String,
    pub ad_text: String,
    pub ad_image: Option<String>,
    pub advertiser_id: Uuid,
}

impl From<&Campaign> for Ad {
    fn from(campaign: &Campaign) -> Self {
        Self {
            ad_id: campaign.id,
            ad_title: campaign.ad_title.clone(),
            ad_text: campaign.ad_text.clone(),
            ad_image: campaign.ad_image.clone(),
            advertiser_id: campaign.advertiser_id,
        }
    }
}

// ─── Delivery facts ────────────────────────────────────────────────────────

/// One impression or click, billed at the campaign's per-unit cost at the
/// moment it was recorded. At most one of each kind per (campaign, client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdFact {
    pub campaign_id: Uuid,
    pub client_id: Uuid,
    pub price: f64,
    /// Simulated day the event occurred.
    pub date: u32,
}

/// Which of a campaign's two usage counters an operation targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    Impressions,
    Clicks,
}

impl std::fmt::Display for CounterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterKind::Impressions => f.write_str("impressions"),
            CounterKind::Clicks => f.write_str("clicks"),
        }
    }
}

// ─── Reports ───────────────────────────────────────────────────────────────

/// A client complaint about a served campaign. References are detached, not
/// cascaded, when the campaign or client is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub message: String,
    pub state: ReportState,
    /// Moderation verdict, written by an external reviewer. None until set.
    pub flagged: Option<bool>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Sent,
    UnderReview,
    TookAction,
    Skipped,
}
