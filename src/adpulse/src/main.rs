//! AdPulse — ad selection and budget-enforcement engine.
//!
//! Entry point that wires the store, counter cache, clock, and delivery
//! engine together, then drives a seeded simulation of the delivery loop so
//! the selection and recording paths can be exercised end to end without an
//! HTTP layer in front.

use std::sync::Arc;

use adpulse_cache::LocalCounterCache;
use adpulse_core::clock::{ClockSource, SimulatedClock};
use adpulse_core::config::AppConfig;
use adpulse_core::types::{
    Ad, Advertiser, CampaignDraft, Client, Gender, TargetGender, Targeting,
};
use adpulse_delivery::{DeliveryConfig, DeliveryEngine};
use adpulse_reporting::stats;
use adpulse_store::AdStore;
use clap::Parser;
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "adpulse")]
#[command(about = "Ad selection and budget-enforcement engine")]
#[command(version)]
struct Cli {
    /// Demo advertisers to seed
    #[arg(long, env = "ADPULSE__DEMO__ADVERTISERS", default_value_t = 4)]
    advertisers: usize,

    /// Demo campaigns to seed
    #[arg(long, env = "ADPULSE__DEMO__CAMPAIGNS", default_value_t = 8)]
    campaigns: usize,

    /// Demo clients to seed
    #[arg(long, env = "ADPULSE__DEMO__CLIENTS", default_value_t = 25)]
    clients: usize,

    /// Simulated days to run
    #[arg(long, env = "ADPULSE__DEMO__DAYS", default_value_t = 10)]
    days: u32,

    /// Probability that a served client clicks
    #[arg(long, default_value_t = 0.3)]
    click_rate: f64,
}

const LOCATIONS: &[&str] = &["Moscow", "Berlin", "Lisbon"];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adpulse=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("AdPulse starting up");

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    info!(
        node_id = %config.node_id,
        w_profit = config.ranking.w_profit,
        w_ml = config.ranking.w_ml,
        w_capacity = config.ranking.w_capacity,
        overrun_probability = config.overrun.probability,
        "Configuration loaded"
    );

    let store = Arc::new(AdStore::new());
    let counters = Arc::new(LocalCounterCache::new());
    let clock = Arc::new(SimulatedClock::new());
    let engine = DeliveryEngine::new(
        store.clone(),
        counters,
        clock.clone(),
        DeliveryConfig::from(&config),
    );

    let (advertiser_ids, client_ids) = seed_demo_data(&store, &cli)?;
    engine.warm_counters();
    info!(
        advertisers = advertiser_ids.len(),
        clients = client_ids.len(),
        campaigns = cli.campaigns,
        "Demo data seeded"
    );

    run_simulation(&engine, &clock, &client_ids, &cli)?;
    report_outcome(&store, &advertiser_ids, clock.current_date())?;

    Ok(())
}

/// Seed advertisers, clients with varied demographics, campaigns with mixed
/// targeting, and a sprinkling of affinity scores.
fn seed_demo_data(store: &AdStore, cli: &Cli) -> anyhow::Result<(Vec<Uuid>, Vec<Uuid>)> {
    let mut rng = rand::thread_rng();

    let advertisers: Vec<Advertiser> = (0..cli.advertisers.max(1))
        .map(|i| Advertiser {
            id: Uuid::new_v4(),
            name: format!("Advertiser {}", i + 1),
        })
        .collect();
    let advertiser_ids: Vec<Uuid> = advertisers.iter().map(|a| a.id).collect();
    store.upsert_advertisers(advertisers)?;

    let clients: Vec<Client> = (0..cli.clients.max(1))
        .map(|i| Client {
            id: Uuid::new_v4(),
            login: format!("client-{i}"),
            age: rng.gen_range(14..=80),
            location: LOCATIONS[i % LOCATIONS.len()].to_string(),
            gender: if i % 2 == 0 {
                Gender::Male
            } else {
                Gender::Female
            },
        })
        .collect();
    let client_ids: Vec<Uuid> = clients.iter().map(|c| c.id).collect();
    store.upsert_clients(clients)?;

    for i in 0..cli.campaigns.max(1) {
        let advertiser_id = advertiser_ids[i % advertiser_ids.len()];
        let targeting = match i % 4 {
            0 => Targeting::default(),
            1 => Targeting {
                location: Some(LOCATIONS[i % LOCATIONS.len()].to_string()),
                ..Targeting::default()
            },
            2 => Targeting {
                gender: Some(if i % 8 < 4 {
                    TargetGender::Female
                } else {
                    TargetGender::Male
                }),
                ..Targeting::default()
            },
            _ => Targeting {
                age_from: Some(18),
                age_to: Some(45),
                gender: Some(TargetGender::All),
                ..Targeting::default()
            },
        };
        store.create_campaign(
            advertiser_id,
            CampaignDraft {
                impressions_limit: rng.gen_range(50..400),
                clicks_limit: rng.gen_range(10..50),
                cost_per_impression: rng.gen_range(0.01..0.20),
                cost_per_click: rng.gen_range(0.05..0.50),
                ad_title: format!("Offer {}", i + 1),
                ad_text: "Limited time offer".to_string(),
                start_date: rng.gen_range(1..3),
                end_date: rng.gen_range(5..=cli.days.max(5)),
                targeting,
            },
            0,
        )?;
    }

    // Affinity for roughly a third of the (advertiser, client) pairs.
    for &client_id in &client_ids {
        for &advertiser_id in &advertiser_ids {
            if rng.gen_bool(0.33) {
                store.set_mlscore(advertiser_id, client_id, rng.gen_range(0..100))?;
            }
        }
    }

    Ok((advertiser_ids, client_ids))
}

/// Advance the clock one day at a time, asking for an ad for every client
/// and recording views plus a random share of clicks.
fn run_simulation(
    engine: &DeliveryEngine,
    clock: &Arc<SimulatedClock>,
    client_ids: &[Uuid],
    cli: &Cli,
) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();

    for day in 1..=cli.days {
        clock.advance(day)?;
        let mut served = 0usize;
        let mut clicked = 0usize;

        for &client_id in client_ids {
            let Some(campaign) = engine.suggest(client_id)? else {
                continue;
            };
            let ad = Ad::from(&campaign);
            engine.record_view(ad.ad_id, client_id)?;
            served += 1;
            if rng.gen_bool(cli.click_rate.clamp(0.0, 1.0)) {
                engine.record_click(ad.ad_id, client_id)?;
                clicked += 1;
            }
        }

        info!(day, served, clicked, "Simulated day complete");
    }
    Ok(())
}

/// Log final ledger-derived statistics per advertiser.
fn report_outcome(store: &AdStore, advertiser_ids: &[Uuid], today: u32) -> anyhow::Result<()> {
    for &advertiser_id in advertiser_ids {
        let totals = stats::advertiser_stats(store, advertiser_id)?;
        let days_active = stats::advertiser_daily_stats(store, advertiser_id, today)?.len();
        info!(
            advertiser_id = %advertiser_id,
            impressions = totals.impressions_count,
            clicks = totals.clicks_count,
            conversion = totals.conversion,
            spent_total = totals.spent_total,
            days_active,
            "Advertiser outcome"
        );
    }
    Ok(())
}
