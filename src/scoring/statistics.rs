use crate::models::{
    AggregateStatistics, ScoreDistribution, ScoreSource, ScoreSummary, ScoreTier, ScoredLead,
};
use crate::scoring::criteria::round_one_decimal;

/// Summarises a scored batch. Returns `None` for an empty batch.
pub fn compute_statistics(scored_leads: &[ScoredLead]) -> Option<AggregateStatistics> {
    let overall = summarize(scored_leads.iter().map(|l| l.score))?;

    let ai = summarize(
        scored_leads
            .iter()
            .filter(|l| l.score_source == ScoreSource::Ai)
            .map(|l| l.score),
    );
    let heuristic = summarize(
        scored_leads
            .iter()
            .filter(|l| l.score_source == ScoreSource::Heuristic)
            .map(|l| l.score),
    );

    let mut distribution = ScoreDistribution::default();
    for lead in scored_leads {
        match ScoreTier::from_score(lead.score) {
            ScoreTier::Excellent => distribution.excellent += 1,
            ScoreTier::Good => distribution.good += 1,
            ScoreTier::Fair => distribution.fair += 1,
            ScoreTier::Poor => distribution.poor += 1,
        }
    }

    let ai_count = ai.map_or(0, |s| s.count);
    let ai_coverage_percent = round_one_decimal(ai_count as f64 / overall.count as f64 * 100.0);

    Some(AggregateStatistics {
        overall,
        ai,
        heuristic,
        distribution,
        ai_coverage_percent,
    })
}

fn summarize(scores: impl Iterator<Item = f64>) -> Option<ScoreSummary> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for score in scores {
        count += 1;
        sum += score;
        min = min.min(score);
        max = max.max(score);
    }

    if count == 0 {
        return None;
    }

    Some(ScoreSummary {
        count,
        average: round_one_decimal(sum / count as f64),
        min,
        max,
    })
}
