//! Delivery statistics, computed by ledger aggregation.
//!
//! These never read the fast-path usage counters: reporting is the
//! authoritative view, counters are the approximation.

use std::collections::BTreeMap;

use adpulse_core::error::AdResult;
use adpulse_core::types::Campaign;
use adpulse_store::ledger::DayTotals;
use adpulse_store::AdStore;
use serde::Serialize;
use uuid::Uuid;

/// Aggregate delivery metrics for a campaign or an advertiser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeliveryStats {
    pub impressions_count: u64,
    pub clicks_count: u64,
    /// Click-through in percent, 0 when nothing was impressed.
    pub conversion: f64,
    pub spent_impressions: f64,
    pub spent_clicks: f64,
    pub spent_total: f64,
}

/// One day's slice of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: u32,
    pub impressions_count: u64,
    pub clicks_count: u64,
    pub conversion: f64,
    pub spent_impressions: f64,
    pub spent_clicks: f64,
    pub spent_total: f64,
}

/// Totals for one campaign over its whole lifetime.
pub fn campaign_stats(store: &AdStore, campaign_id: Uuid) -> AdResult<DeliveryStats> {
    store.get_campaign(campaign_id)?;
    let totals = store.ledger().totals(campaign_id);
    Ok(build_stats(
        totals.impressions_count,
        totals.clicks_count,
        totals.spent_impressions,
        totals.spent_clicks,
    ))
}

/// Per-day series for one campaign, ascending by day, zero-filled for days
/// without traffic. The series runs from the campaign's start to its last
/// click (or scheduled end, whichever is later recorded), clamped to today.
pub fn campaign_daily_stats(
    store: &AdStore,
    campaign_id: Uuid,
    today: u32,
) -> AdResult<Vec<DailyStats>> {
    let campaign = store.get_campaign(campaign_id)?;
    let days = store.ledger().daily_totals(campaign_id);
    Ok(fill_daily_series(&campaign, &days, today))
}

/// Totals across every campaign the advertiser owns.
pub fn advertiser_stats(store: &AdStore, advertiser_id: Uuid) -> AdResult<DeliveryStats> {
    store.get_advertiser(advertiser_id)?;

    let mut impressions = 0u64;
    let mut clicks = 0u64;
    let mut spent_impressions = 0.0;
    let mut spent_clicks = 0.0;
    for campaign in store.campaigns_for_advertiser(advertiser_id) {
        let totals = store.ledger().totals(campaign.id);
        impressions += totals.impressions_count;
        clicks += totals.clicks_count;
        spent_impressions += totals.spent_impressions;
        spent_clicks += totals.spent_clicks;
    }
    Ok(build_stats(impressions, clicks, spent_impressions, spent_clicks))
}

/// Merged per-day series across the advertiser's campaigns.
pub fn advertiser_daily_stats(
    store: &AdStore,
    advertiser_id: Uuid,
    today: u32,
) -> AdResult<Vec<DailyStats>> {
    store.get_advertiser(advertiser_id)?;

    let mut merged: BTreeMap<u32, DayTotals> = BTreeMap::new();
    for campaign in store.campaigns_for_advertiser(advertiser_id) {
        let days = store.ledger().daily_totals(campaign.id);
        for daily in fill_daily_series(&campaign, &days, today) {
            let day = merged.entry(daily.date).or_default();
            day.impressions_count += daily.impressions_count;
            day.clicks_count += daily.clicks_count;
            day.spent_impressions += daily.spent_impressions;
            day.spent_clicks += daily.spent_clicks;
        }
    }
    Ok(merged
        .into_iter()
        .map(|(date, day)| daily_from_totals(date, day))
        .collect())
}

fn fill_daily_series(
    campaign: &Campaign,
    days: &BTreeMap<u32, DayTotals>,
    today: u32,
) -> Vec<DailyStats> {
    let last_click = days
        .iter()
        .filter(|(_, day)| day.clicks_count > 0)
        .map(|(date, _)| *date)
        .max()
        .unwrap_or(campaign.end_date);
    let end = last_click.min(today);
    if end < campaign.start_date {
        return Vec::new();
    }

    (campaign.start_date..=end)
        .map(|date| daily_from_totals(date, days.get(&date).copied().unwrap_or_default()))
        .collect()
}

fn daily_from_totals(date: u32, day: DayTotals) -> DailyStats {
    let stats = build_stats(
        day.impressions_count,
        day.clicks_count,
        day.spent_impressions,
        day.spent_clicks,
    );
    DailyStats {
        date,
        impressions_count: stats.impressions_count,
        clicks_count: stats.clicks_count,
        conversion: stats.conversion,
        spent_impressions: stats.spent_impressions,
        spent_clicks: stats.spent_clicks,
        spent_total: stats.spent_total,
    }
}

fn build_stats(
    impressions_count: u64,
    clicks_count: u64,
    spent_impressions: f64,
    spent_clicks: f64,
) -> DeliveryStats {
    let conversion = if impressions_count > 0 {
        round_to(clicks_count as f64 / impressions_count as f64 * 100.0, 2)
    } else {
        0.0
    };
    DeliveryStats {
        impressions_count,
        clicks_count,
        conversion,
        spent_impressions: round_to(spent_impressions, 9),
        spent_clicks: round_to(spent_clicks, 9),
        spent_total: round_to(spent_impressions + spent_clicks, 9),
    }
}

/// Round half-up to `digits` decimal places, taming float-sum noise.
fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpulse_core::types::{AdFact, Advertiser, CampaignDraft, Client, Gender, Targeting};

    fn make_seeded_store() -> (AdStore, Uuid, Uuid) {
        let store = AdStore::new();
        let advertiser_id = Uuid::new_v4();
        store
            .upsert_advertisers(vec![Advertiser {
                id: advertiser_id,
                name: "Acme".to_string(),
            }])
            .unwrap();
        let campaign = store
            .create_campaign(
                advertiser_id,
                CampaignDraft {
                    impressions_limit: 100,
                    clicks_limit: 50,
                    cost_per_impression: 0.5,
                    cost_per_click: 2.0,
                    ad_title: "Sale".to_string(),
                    ad_text: "Now".to_string(),
                    start_date: 1,
                    end_date: 10,
                    targeting: Targeting::default(),
                },
                0,
            )
            .unwrap();
        (store, advertiser_id, campaign.id)
    }

    fn add_client(store: &AdStore) -> Uuid {
        let client_id = Uuid::new_v4();
        store
            .upsert_clients(vec![Client {
                id: client_id,
                login: format!("user-{client_id}"),
                age: 25,
                location: "Moscow".to_string(),
                gender: Gender::Female,
            }])
            .unwrap();
        client_id
    }

    fn impress(store: &AdStore, campaign_id: Uuid, client_id: Uuid, date: u32) {
        store
            .ledger()
            .record_impression(AdFact {
                campaign_id,
                client_id,
                price: 0.5,
                date,
            })
            .unwrap();
    }

    #[test]
    fn test_campaign_totals_and_conversion() {
        let (store, _, campaign_id) = make_seeded_store();
        for _ in 0..3 {
            impress(&store, campaign_id, add_client(&store), 1);
        }
        let clicker = add_client(&store);
        impress(&store, campaign_id, clicker, 2);
        store
            .ledger()
            .record_click(AdFact {
                campaign_id,
                client_id: clicker,
                price: 2.0,
                date: 2,
            })
            .unwrap();

        let stats = campaign_stats(&store, campaign_id).unwrap();
        assert_eq!(stats.impressions_count, 4);
        assert_eq!(stats.clicks_count, 1);
        assert_eq!(stats.conversion, 25.0);
        assert_eq!(stats.spent_impressions, 2.0);
        assert_eq!(stats.spent_clicks, 2.0);
        assert_eq!(stats.spent_total, 4.0);
    }

    #[test]
    fn test_empty_campaign_reports_zeroes() {
        let (store, _, campaign_id) = make_seeded_store();
        let stats = campaign_stats(&store, campaign_id).unwrap();
        assert_eq!(stats, DeliveryStats::default());
    }

    #[test]
    fn test_daily_series_zero_fills_quiet_days() {
        let (store, _, campaign_id) = make_seeded_store();
        impress(&store, campaign_id, add_client(&store), 1);
        let clicker = add_client(&store);
        impress(&store, campaign_id, clicker, 4);
        store
            .ledger()
            .record_click(AdFact {
                campaign_id,
                client_id: clicker,
                price: 2.0,
                date: 4,
            })
            .unwrap();

        let series = campaign_daily_stats(&store, campaign_id, 6).unwrap();
        // start_date 1 through the last click on day 4.
        assert_eq!(series.len(), 4);
        assert_eq!(series[0].date, 1);
        assert_eq!(series[0].impressions_count, 1);
        assert_eq!(series[1].impressions_count, 0);
        assert_eq!(series[3].date, 4);
        assert_eq!(series[3].clicks_count, 1);
    }

    #[test]
    fn test_daily_series_without_clicks_runs_to_end_date_clamped_by_today() {
        let (store, _, campaign_id) = make_seeded_store();
        impress(&store, campaign_id, add_client(&store), 2);

        let series = campaign_daily_stats(&store, campaign_id, 3).unwrap();
        assert_eq!(series.first().map(|d| d.date), Some(1));
        assert_eq!(series.last().map(|d| d.date), Some(3));
    }

    #[test]
    fn test_daily_series_empty_before_start() {
        let (store, advertiser_id, _) = make_seeded_store();
        let future = store
            .create_campaign(
                advertiser_id,
                CampaignDraft {
                    impressions_limit: 10,
                    clicks_limit: 5,
                    cost_per_impression: 0.1,
                    cost_per_click: 0.2,
                    ad_title: "Later".to_string(),
                    ad_text: "Soon".to_string(),
                    start_date: 8,
                    end_date: 12,
                    targeting: Targeting::default(),
                },
                0,
            )
            .unwrap();

        assert!(campaign_daily_stats(&store, future.id, 3)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_advertiser_stats_sum_campaigns() {
        let (store, advertiser_id, first) = make_seeded_store();
        let second = store
            .create_campaign(
                advertiser_id,
                CampaignDraft {
                    impressions_limit: 100,
                    clicks_limit: 50,
                    cost_per_impression: 1.0,
                    cost_per_click: 3.0,
                    ad_title: "Other".to_string(),
                    ad_text: "Ad".to_string(),
                    start_date: 1,
                    end_date: 10,
                    targeting: Targeting::default(),
                },
                0,
            )
            .unwrap();

        impress(&store, first, add_client(&store), 1);
        store
            .ledger()
            .record_impression(AdFact {
                campaign_id: second.id,
                client_id: add_client(&store),
                price: 1.0,
                date: 2,
            })
            .unwrap();

        let stats = advertiser_stats(&store, advertiser_id).unwrap();
        assert_eq!(stats.impressions_count, 2);
        assert_eq!(stats.spent_impressions, 1.5);
    }
}
