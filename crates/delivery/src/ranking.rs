//! Ranking — blends remaining profit, advertiser affinity, and budget
//! capacity pressure into one priority score and picks a single winner.

use adpulse_core::config::RankingConfig;
use adpulse_core::types::Campaign;
use uuid::Uuid;

/// Per-candidate ranking inputs, assembled by the engine from the campaign,
/// the counter cache, and the client's ledger history.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSignals {
    pub campaign_id: Uuid,
    /// Revenue still obtainable from this client.
    pub profit: f64,
    pub ml_score: u64,
    /// Fraction of the impression budget already consumed.
    pub capacity_used: f64,
}

/// Build the ranking signals for one candidate, or `None` when no further
/// revenue is obtainable (already clicked, or zero remaining profit).
pub fn build_signals(
    campaign: &Campaign,
    ml_score: u64,
    served_impressions: u64,
    has_impression: bool,
    has_click: bool,
) -> Option<CandidateSignals> {
    if has_click {
        // Both events already billed; nothing left to earn here.
        return None;
    }
    let profit = if has_impression {
        campaign.cost_per_click
    } else {
        campaign.cost_per_impression + campaign.cost_per_click
    };
    if profit <= 0.0 {
        return None;
    }

    let capacity_used = if campaign.impressions_limit > 0 {
        let remaining = campaign.impressions_limit.saturating_sub(served_impressions);
        1.0 - remaining as f64 / campaign.impressions_limit as f64
    } else {
        0.0
    };

    Some(CandidateSignals {
        campaign_id: campaign.id,
        profit,
        ml_score,
        capacity_used,
    })
}

/// Pick the winning campaign id: normalize profit and affinity across the
/// surviving set, take the weighted sum, and return the maximum. Equal
/// priorities resolve by ascending campaign id, so a fixed candidate set
/// always yields the same winner regardless of input order.
pub fn select_winner(candidates: &[CandidateSignals], weights: &RankingConfig) -> Option<Uuid> {
    if candidates.is_empty() {
        return None;
    }

    let max_profit = candidates.iter().map(|c| c.profit).fold(f64::MIN, f64::max);
    let min_profit = candidates.iter().map(|c| c.profit).fold(f64::MAX, f64::min);
    let profit_range = if max_profit > min_profit {
        max_profit - min_profit
    } else {
        1.0
    };
    let max_ml = candidates.iter().map(|c| c.ml_score).max().unwrap_or(0);

    let mut best: Option<(f64, Uuid)> = None;
    for candidate in candidates {
        let norm_profit = (candidate.profit - min_profit) / profit_range;
        let norm_ml = if max_ml > 0 {
            candidate.ml_score as f64 / max_ml as f64
        } else {
            0.0
        };
        let priority = weights.w_profit * norm_profit
            + weights.w_ml * norm_ml
            + weights.w_capacity * candidate.capacity_used;

        let replace = match best {
            None => true,
            Some((best_priority, best_id)) => {
                priority > best_priority
                    || (priority == best_priority && candidate.campaign_id < best_id)
            }
        };
        if replace {
            best = Some((priority, candidate.campaign_id));
        }
    }
    best.map(|(_, id)| id)
}
