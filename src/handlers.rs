use crate::cache_validator::{request_fingerprint, ScoreCacheExpiry, ValidatedCacheEntry};
use crate::config::{Config, MAX_SCORE_CACHE_TTL_SECS};
use crate::errors::AppError;
use crate::lead_store::{LeadStore, MAX_LEADS_PER_BATCH};
use crate::models::*;
use crate::scoring::statistics::compute_statistics;
use crate::scoring::weights::ScoringWeightsOverride;
use crate::scoring::{LeadFilter, ScoringEngine, ScoringOutcome};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_STORED_LEADS_LIMIT: i64 = 500;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Lookup tables, default weights and freshness window.
    pub engine: ScoringEngine,
    /// Stored-lead access; `None` when no database is configured.
    pub lead_store: Option<LeadStore>,
    /// Scored responses keyed by request fingerprint.
    pub score_cache: Cache<String, ValidatedCacheEntry>,
}

impl AppState {
    pub fn new(config: Config, engine: ScoringEngine, lead_store: Option<LeadStore>) -> Self {
        let score_cache = Cache::builder()
            .max_capacity(1_000)
            .expire_after(ScoreCacheExpiry)
            .build();

        Self {
            config,
            engine,
            lead_store,
            score_cache,
        }
    }
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-scoring-api",
            "version": env!("CARGO_PKG_VERSION"),
            "database": if state.lead_store.is_some() { "configured" } else { "disabled" },
        })),
    )
}

/// POST /api/v1/scoring/score
///
/// Scores a batch of leads supplied in the body against their external scores.
/// Identical requests are answered from the score cache until the TTL runs out or
/// the clock would change the result, whichever comes first.
pub async fn score_leads(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    tracing::info!(
        "POST /scoring/score - {} lead(s), {} external score(s)",
        request.leads.len(),
        request.external_scores.len()
    );

    if request.leads.len() as i64 > MAX_LEADS_PER_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {} leads per request",
            MAX_LEADS_PER_BATCH
        )));
    }
    if let Some(ref overrides) = request.weights {
        validate_overrides(overrides)?;
    }

    let now = Utc::now();
    let cache_key = request_fingerprint(&request)?;
    if let Some(entry) = state.score_cache.get(&cache_key).await {
        if entry.is_expired(now) {
            tracing::debug!("Score cache entry expired: {}", &cache_key[..12]);
        } else if let Some(cached) = entry.open() {
            tracing::debug!("✓ Score cache hit: {}", &cache_key[..12]);
            return Ok(Json(cached));
        }
        state.score_cache.invalidate(&cache_key).await;
    }

    let weights = match request.weights {
        Some(ref overrides) => state.engine.weights().with_overrides(overrides),
        None => *state.engine.weights(),
    };

    let outcome = state
        .engine
        .rescore(&request.leads, &request.external_scores, &weights, now);

    let response = ScoreResponse {
        scored_leads: outcome.scored_leads,
        statistics: if request.include_statistics {
            outcome.statistics
        } else {
            None
        },
    };

    let ttl_secs = state.config.score_cache_ttl_secs.min(MAX_SCORE_CACHE_TTL_SECS);
    let mut expires_at = now + chrono::Duration::seconds(ttl_secs as i64);
    let next_change = state
        .engine
        .next_change_at(&request.leads, &request.external_scores, now);
    if let Some(change) = next_change {
        expires_at = expires_at.min(change);
    }

    state
        .score_cache
        .insert(cache_key, ValidatedCacheEntry::seal(&response, expires_at)?)
        .await;

    Ok(Json(response))
}

/// POST /api/v1/scoring/statistics
///
/// Summarises an already scored batch. `statistics` is null for an empty batch.
pub async fn score_statistics(
    Json(scored_leads): Json<Vec<ScoredLead>>,
) -> Json<serde_json::Value> {
    tracing::info!("POST /scoring/statistics - {} scored lead(s)", scored_leads.len());

    Json(json!({
        "statistics": compute_statistics(&scored_leads),
    }))
}

/// GET /api/v1/scoring/weights
pub async fn get_weights(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let weights = state.engine.weights();

    Json(json!({
        "weights": weights,
        "total": weights.total(),
        "normalized": weights.is_normalized(),
        "ai_score_max_age_days": state.config.ai_score_max_age_days,
    }))
}

/// GET /api/v1/leads/scores
///
/// Loads the newest stored leads (up to `MAX_LEADS_PER_BATCH`) and their latest
/// external scores, scores them and applies the query filters. `statistics` covers
/// every matching lead; `scored_leads` holds the best `limit` of them, ranked by score.
pub async fn stored_lead_scores(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StoredLeadsQuery>,
) -> Result<Json<ScoreResponse>, AppError> {
    tracing::info!("GET /leads/scores - params: {:?}", params);

    let store = state.lead_store.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Stored-lead scoring requires DB_URL".to_string())
    })?;

    let filter = build_filter(&params)?;
    let limit = params.limit.unwrap_or(DEFAULT_STORED_LEADS_LIMIT);
    if limit <= 0 {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }

    let (leads, external_scores) = store
        .load_batch(params.city.as_deref(), MAX_LEADS_PER_BATCH)
        .await?;
    let outcome = state.engine.score(&leads, &external_scores);
    let response = top_matching(outcome.scored_leads, &filter, limit as usize);

    tracing::info!(
        "Scored {} stored lead(s), returning {}",
        leads.len(),
        response.scored_leads.len()
    );

    Ok(Json(response))
}

/// Filters a scored batch, summarises the matches and keeps the `limit` best.
fn top_matching(
    scored_leads: Vec<ScoredLead>,
    filter: &LeadFilter,
    limit: usize,
) -> ScoreResponse {
    let filtered = filter.apply(scored_leads);
    let statistics = compute_statistics(&filtered);
    let outcome = ScoringOutcome {
        scored_leads: filtered,
        statistics,
    };

    ScoreResponse {
        scored_leads: outcome.ranked().into_iter().take(limit).cloned().collect(),
        statistics: outcome.statistics,
    }
}

fn validate_overrides(overrides: &ScoringWeightsOverride) -> Result<(), AppError> {
    let values = [
        ("contact_info", overrides.contact_info),
        ("business_profile", overrides.business_profile),
        ("location", overrides.location),
        ("niche", overrides.niche),
        ("engagement", overrides.engagement),
        ("whatsapp", overrides.whatsapp),
        ("data_quality", overrides.data_quality),
    ];

    for (name, value) in values {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "Weight {} must be a non-negative number",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn build_filter(params: &StoredLeadsQuery) -> Result<LeadFilter, AppError> {
    let tier = params
        .tier
        .as_deref()
        .map(|t| {
            ScoreTier::parse(t)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown tier: {}", t)))
        })
        .transpose()?;

    let source = params
        .source
        .as_deref()
        .map(|s| {
            ScoreSource::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown score source: {}", s)))
        })
        .transpose()?;

    Ok(LeadFilter {
        status: params.status.clone(),
        city: params.city.clone(),
        min_score: params.min_score,
        source,
        tier,
    })
}
