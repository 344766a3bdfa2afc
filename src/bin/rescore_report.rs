//! Offline report: scores the stored leads and prints the batch statistics and top leads.
//!
//! Usage: `rescore_report [city] [limit]`

use dotenvy::dotenv;
use rust_lead_scoring_api::config::Config;
use rust_lead_scoring_api::db::Database;
use rust_lead_scoring_api::api::lead_store::LeadStore;
use std::env;

const TOP_LEADS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DB_URL or DATABASE_URL must be set"))?;

    let mut args = env::args().skip(1);
    let city = args.next().filter(|c| !c.trim().is_empty());
    let limit: i64 = match args.next() {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("limit must be a number, got {}", raw))?,
        None => 1_000,
    };

    let engine = config.build_engine()?;
    let db = Database::new(&database_url).await?;
    let store = LeadStore::new(db.pool);

    let (leads, external_scores) = store
        .load_batch(city.as_deref(), limit)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(
        "Loaded {} lead(s) and {} AI score(s)",
        leads.len(),
        external_scores.len()
    );

    let outcome = engine.score(&leads, &external_scores);

    let stats = match outcome.statistics {
        Some(ref stats) => stats,
        None => {
            println!("No leads to score.");
            return Ok(());
        }
    };

    println!("=== Lead Score Report ===\n");
    println!(
        "Leads: {}  avg {:.1}  min {:.1}  max {:.1}",
        stats.overall.count, stats.overall.average, stats.overall.min, stats.overall.max
    );
    println!("AI coverage: {:.1}%", stats.ai_coverage_percent);
    if let Some(ai) = stats.ai {
        println!("  ai:        {} lead(s), avg {:.1}", ai.count, ai.average);
    }
    if let Some(heuristic) = stats.heuristic {
        println!(
            "  heuristic: {} lead(s), avg {:.1}",
            heuristic.count, heuristic.average
        );
    }
    println!(
        "Distribution: excellent {}  good {}  fair {}  poor {}\n",
        stats.distribution.excellent,
        stats.distribution.good,
        stats.distribution.fair,
        stats.distribution.poor
    );

    println!("Top {} leads:", TOP_LEADS);
    for (idx, scored) in outcome.ranked().into_iter().take(TOP_LEADS).enumerate() {
        println!(
            "{:>2}. {:>4.1} [{:?}] {} ({}, {})",
            idx + 1,
            scored.score,
            scored.score_source,
            scored.lead.business_name,
            scored.lead.city,
            scored.lead.status
        );
    }

    Ok(())
}
