//! Candidate eligibility — time window, targeting match, soft budget cap.

use adpulse_core::config::OverrunConfig;
use adpulse_core::types::{Campaign, Client};

/// Whether the campaign's targeting accepts this client. Absent constraints
/// match everyone.
pub fn matches_targeting(campaign: &Campaign, client: &Client) -> bool {
    let targeting = &campaign.targeting;

    if let Some(location) = &targeting.location {
        if *location != client.location {
            return false;
        }
    }
    if let Some(gender) = targeting.gender {
        if !gender.matches(client.gender) {
            return false;
        }
    }
    if targeting.age_from.is_some_and(|from| from > client.age) {
        return false;
    }
    if targeting.age_to.is_some_and(|to| to < client.age) {
        return false;
    }
    true
}

/// Time-active and targeting-compatible. The budget pre-filter is applied
/// separately because it needs counter reads and the per-client impression
/// set.
pub fn is_eligible(campaign: &Campaign, client: &Client, today: u32) -> bool {
    campaign.active(today) && matches_targeting(campaign, client)
}

/// Soft budget check for a candidate the client has not been impressed by.
/// `overrun_granted` is this request's Bernoulli draw for this candidate:
/// when granted, the limit stretches by the configured allowance, so
/// delivery does not hard-stop exactly at the limit.
pub fn passes_budget(
    served_impressions: u64,
    impressions_limit: u64,
    policy: &OverrunConfig,
    overrun_granted: bool,
) -> bool {
    let allowance = if overrun_granted { policy.allowance } else { 0.0 };
    (served_impressions as f64) < (impressions_limit as f64) * (1.0 + allowance)
}

/// Sample the overrun draw for one candidate. Independent per candidate per
/// request.
pub fn draw_overrun(policy: &OverrunConfig) -> bool {
    policy.probability > 0.0 && rand::random::<f64>() < policy.probability
}
