//! Lead scoring core.
//!
//! Pure, synchronous computation over in-memory inputs: no I/O, no shared state.
//! The host decides when to recompute and what to cache.
//!
//! ```rust
//! use rust_lead_scoring_api::scoring;
//!
//! let outcome = scoring::score(&[], &[], None);
//! assert!(outcome.scored_leads.is_empty());
//! assert!(outcome.statistics.is_none());
//! ```

pub mod arbiter;
pub mod criteria;
pub mod statistics;
pub mod tables;
pub mod weights;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{AggregateStatistics, ExternalScore, Lead, ScoreSource, ScoreTier, ScoredLead};
use arbiter::{ScoreArbiter, DEFAULT_FRESHNESS_DAYS};
use criteria::CriteriaCalculator;
use statistics::compute_statistics;
use tables::ScoringTables;
use weights::{ScoringWeights, WeightedAggregator};

/// Result of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    /// One entry per input lead, in input order.
    pub scored_leads: Vec<ScoredLead>,
    pub statistics: Option<AggregateStatistics>,
}

impl ScoringOutcome {
    /// Scored leads ordered by score, highest first. Ties keep input order.
    pub fn ranked(&self) -> Vec<&ScoredLead> {
        let mut ranked: Vec<&ScoredLead> = self.scored_leads.iter().collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked
    }
}

/// Post-scoring filter over a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub status: Option<String>,
    pub city: Option<String>,
    pub min_score: Option<f64>,
    pub source: Option<ScoreSource>,
    pub tier: Option<ScoreTier>,
}

impl LeadFilter {
    pub fn matches(&self, scored: &ScoredLead) -> bool {
        if let Some(status) = &self.status {
            if crate::models::LeadStatus::parse(status) != scored.lead.status {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if city.trim().to_lowercase() != scored.lead.city.trim().to_lowercase() {
                return false;
            }
        }
        if let Some(min_score) = self.min_score {
            if scored.score < min_score {
                return false;
            }
        }
        if let Some(source) = self.source {
            if scored.score_source != source {
                return false;
            }
        }
        if let Some(tier) = self.tier {
            if scored.tier != tier {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, scored_leads: Vec<ScoredLead>) -> Vec<ScoredLead> {
        scored_leads.into_iter().filter(|l| self.matches(l)).collect()
    }
}

/// Scoring configuration: lookup tables, weights and the external-score freshness window.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    tables: ScoringTables,
    weights: ScoringWeights,
    max_ai_score_age: Duration,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringTables::default())
    }
}

impl ScoringEngine {
    pub fn new(tables: ScoringTables) -> Self {
        Self {
            tables,
            weights: ScoringWeights::default(),
            max_ai_score_age: Duration::days(DEFAULT_FRESHNESS_DAYS),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_max_ai_score_age(mut self, max_age: Duration) -> Self {
        self.max_ai_score_age = max_age;
        self
    }

    pub fn tables(&self) -> &ScoringTables {
        &self.tables
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Scores a batch against the current time.
    pub fn score(&self, leads: &[Lead], external_scores: &[ExternalScore]) -> ScoringOutcome {
        self.score_at(leads, external_scores, Utc::now())
    }

    /// Scores a batch against an explicit `now`.
    pub fn score_at(
        &self,
        leads: &[Lead],
        external_scores: &[ExternalScore],
        now: DateTime<Utc>,
    ) -> ScoringOutcome {
        self.rescore(leads, external_scores, &self.weights, now)
    }

    /// Recomputes a batch with explicit weights. The engine itself is left untouched.
    pub fn rescore(
        &self,
        leads: &[Lead],
        external_scores: &[ExternalScore],
        weights: &ScoringWeights,
        now: DateTime<Utc>,
    ) -> ScoringOutcome {
        if !weights.is_normalized() {
            tracing::warn!(
                "Scoring with weights that sum to {:.3} instead of 1.0",
                weights.total()
            );
        }

        let arbiter = ScoreArbiter::new(
            CriteriaCalculator::new(&self.tables),
            WeightedAggregator::new(*weights),
            self.max_ai_score_age,
        );

        let scored_leads = arbiter.arbitrate(leads, external_scores, now);
        let statistics = compute_statistics(&scored_leads);

        tracing::debug!(
            "Scored {} lead(s): {} ai, {} heuristic",
            scored_leads.len(),
            statistics.as_ref().and_then(|s| s.ai).map_or(0, |s| s.count),
            statistics
                .as_ref()
                .and_then(|s| s.heuristic)
                .map_or(0, |s| s.count),
        );

        ScoringOutcome {
            scored_leads,
            statistics,
        }
    }

    /// Earliest instant after `now` at which scoring the same batch may give a
    /// different outcome. Weights do not affect it.
    pub fn next_change_at(
        &self,
        leads: &[Lead],
        external_scores: &[ExternalScore],
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        ScoreArbiter::new(
            CriteriaCalculator::new(&self.tables),
            WeightedAggregator::new(self.weights),
            self.max_ai_score_age,
        )
        .next_change_at(leads, external_scores, now)
    }
}

/// Scores `leads` with the default tables, optionally overriding the weights.
pub fn score(
    leads: &[Lead],
    external_scores: &[ExternalScore],
    weights: Option<ScoringWeights>,
) -> ScoringOutcome {
    let engine = ScoringEngine::default();
    let weights = weights.unwrap_or_else(|| *engine.weights());
    engine.rescore(leads, external_scores, &weights, Utc::now())
}
