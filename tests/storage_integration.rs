use std::env;

use rust_lead_scoring_api::db::Database;
use rust_lead_scoring_api::lead_store::LeadStore;
use rust_lead_scoring_api::scoring::ScoringEngine;

/// Integration smoke test for loading stored leads and scoring them.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn load_and_score_stored_leads_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let store = LeadStore::new(db.pool.clone());

    let (leads, external_scores) = store
        .load_batch(None, 50)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(leads.len() <= 50);

    // Every loaded score belongs to a loaded lead
    for score in &external_scores {
        assert!(leads.iter().any(|lead| lead.id == score.lead_id));
    }

    let outcome = ScoringEngine::default().score(&leads, &external_scores);
    assert_eq!(outcome.scored_leads.len(), leads.len());
    assert_eq!(outcome.statistics.is_some(), !leads.is_empty());
    Ok(())
}
