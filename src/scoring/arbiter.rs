//! Score source arbiter
//!
//! Decides per lead whether the surfaced score comes from the external (AI) scorer or
//! from the local heuristic, and assembles the matching `ScoredLead`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{
    AiAttribution, ExternalScore, Lead, ScoreSource, ScoreTier, ScoredLead, ScoringBreakdown,
};
use crate::scoring::criteria::{round_one_decimal, CriteriaCalculator};
use crate::scoring::weights::WeightedAggregator;

/// External scores older than this fall back to the heuristic.
pub const DEFAULT_FRESHNESS_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy)]
pub struct ScoreArbiter<'a> {
    calculator: CriteriaCalculator<'a>,
    aggregator: WeightedAggregator,
    max_age: Duration,
}

impl<'a> ScoreArbiter<'a> {
    pub fn new(
        calculator: CriteriaCalculator<'a>,
        aggregator: WeightedAggregator,
        max_age: Duration,
    ) -> Self {
        Self {
            calculator,
            aggregator,
            max_age,
        }
    }

    /// True when `score` was created less than the freshness window before `now`.
    pub fn is_fresh(&self, score: &ExternalScore, now: DateTime<Utc>) -> bool {
        now - score.created_at < self.max_age
    }

    /// Scores every lead, keeping input order.
    pub fn arbitrate(
        &self,
        leads: &[Lead],
        external_scores: &[ExternalScore],
        now: DateTime<Utc>,
    ) -> Vec<ScoredLead> {
        let latest = latest_by_lead(external_scores);

        leads
            .iter()
            .map(|lead| match latest.get(lead.id.as_str()) {
                Some(external) if self.is_fresh(external, now) => from_external(lead, external),
                Some(external) => {
                    tracing::debug!(
                        "External score for lead {} is stale ({}), using heuristic",
                        lead.id,
                        external.created_at
                    );
                    self.heuristic(lead, now)
                }
                None => self.heuristic(lead, now),
            })
            .collect()
    }

    /// Earliest instant after `now` at which arbitrating the same batch could give a
    /// different result: a fresh external score going stale, or a lead crossing an
    /// age bucket. `None` when nothing in the batch depends on time any more.
    pub fn next_change_at(
        &self,
        leads: &[Lead],
        external_scores: &[ExternalScore],
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let latest = latest_by_lead(external_scores);

        let staleness = latest
            .values()
            .filter(|external| self.is_fresh(external, now))
            .filter_map(|external| external.created_at.checked_add_signed(self.max_age));
        let buckets = leads
            .iter()
            .filter_map(|lead| self.calculator.next_bucket_change(lead, now));

        staleness.chain(buckets).filter(|at| *at > now).min()
    }

    /// Locally computed score with its full breakdown.
    pub fn heuristic(&self, lead: &Lead, now: DateTime<Utc>) -> ScoredLead {
        let criteria = self.calculator.calculate(lead, now);
        let blends = WeightedAggregator::blend(&criteria);
        let score = self.aggregator.aggregate(&blends);

        ScoredLead {
            lead: lead.clone(),
            score,
            score_source: ScoreSource::Heuristic,
            tier: ScoreTier::from_score(score),
            scoring_breakdown: Some(ScoringBreakdown {
                criteria,
                blends,
                weights: *self.aggregator.weights(),
                weighted_score: score,
            }),
            ai: None,
        }
    }
}

/// Most recent external score per lead id.
pub fn latest_by_lead(external_scores: &[ExternalScore]) -> HashMap<&str, &ExternalScore> {
    let mut latest: HashMap<&str, &ExternalScore> = HashMap::new();
    for score in external_scores {
        latest
            .entry(score.lead_id.as_str())
            .and_modify(|current| {
                if score.created_at > current.created_at {
                    *current = score;
                }
            })
            .or_insert(score);
    }
    latest
}

fn from_external(lead: &Lead, external: &ExternalScore) -> ScoredLead {
    let score = if external.score.is_finite() {
        round_one_decimal(external.score.clamp(0.0, 10.0))
    } else {
        0.0
    };

    ScoredLead {
        lead: lead.clone(),
        score,
        score_source: ScoreSource::Ai,
        tier: ScoreTier::from_score(score),
        scoring_breakdown: None,
        ai: Some(AiAttribution {
            rationale: external.rationale.clone(),
            confidence: external.confidence,
            model: external.model.clone(),
            scored_at: external.created_at,
        }),
    }
}
