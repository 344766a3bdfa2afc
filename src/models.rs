use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scoring::weights::{ScoringWeights, ScoringWeightsOverride};

// ============ Lead Models ============

/// Pipeline status of a lead.
///
/// Parsed case-insensitively from English and Portuguese labels. Anything outside the
/// known vocabulary is kept verbatim in `Other` and scores with each table's default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Scheduled,
    Proposal,
    Converted,
    Closed,
    Lost,
    Cancelled,
    Other(String),
}

impl LeadStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "new" | "novo" => LeadStatus::New,
            "contacted" | "contatado" | "contactado" | "em contato" => LeadStatus::Contacted,
            "qualified" | "qualificado" => LeadStatus::Qualified,
            "scheduled" | "agendado" => LeadStatus::Scheduled,
            "proposal" | "proposta" => LeadStatus::Proposal,
            "converted" | "convertido" | "ganho" => LeadStatus::Converted,
            "closed" | "fechado" => LeadStatus::Closed,
            "lost" | "perdido" => LeadStatus::Lost,
            "cancelled" | "canceled" | "cancelado" => LeadStatus::Cancelled,
            _ => LeadStatus::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Scheduled => "scheduled",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Converted => "converted",
            LeadStatus::Closed => "closed",
            LeadStatus::Lost => "lost",
            LeadStatus::Cancelled => "cancelled",
            LeadStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for LeadStatus {
    fn from(value: String) -> Self {
        LeadStatus::parse(&value)
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sales lead as captured by the CRM.
///
/// Read-only input to the scoring core. Free-text fields may be empty; optional fields
/// may be absent. Neither case is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Stable unique identifier.
    pub id: String,
    /// Contact person's display name.
    #[serde(default)]
    pub name: String,
    /// Business (company) name.
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub niche: Option<String>,
    /// Free-text phone number, any formatting.
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    /// Origin tag (website, landing, google, ...).
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub whatsapp_verified: bool,
    #[serde(default)]
    pub whatsapp_exists: bool,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A score produced by the external (AI) scoring process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalScore {
    pub lead_id: String,
    /// Score on the 0-10 scale.
    pub score: f64,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Confidence in 0-1.
    #[serde(default)]
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

// ============ Scoring Output Models ============

/// Where the surfaced score of a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Ai,
    Heuristic,
}

impl ScoreSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ai" => Some(ScoreSource::Ai),
            "heuristic" => Some(ScoreSource::Heuristic),
            _ => None,
        }
    }
}

/// Quality band of a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
    /// score >= 8
    Excellent,
    /// 6 <= score < 8
    Good,
    /// 4 <= score < 6
    Fair,
    /// score < 4
    Poor,
}

impl ScoreTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            ScoreTier::Excellent
        } else if score >= 6.0 {
            ScoreTier::Good
        } else if score >= 4.0 {
            ScoreTier::Fair
        } else {
            ScoreTier::Poor
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "excellent" => Some(ScoreTier::Excellent),
            "good" => Some(ScoreTier::Good),
            "fair" => Some(ScoreTier::Fair),
            "poor" => Some(ScoreTier::Poor),
            _ => None,
        }
    }
}

/// The eleven raw criteria, each in 0-10.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriteriaScores {
    pub phone: f64,
    pub email: f64,
    pub business_name: f64,
    pub city: f64,
    pub niche: f64,
    pub response_time: f64,
    pub engagement: f64,
    pub whatsapp: f64,
    pub source: f64,
    pub completeness: f64,
    pub lead_age: f64,
}

impl CriteriaScores {
    pub fn values(&self) -> [f64; 11] {
        [
            self.phone,
            self.email,
            self.business_name,
            self.city,
            self.niche,
            self.response_time,
            self.engagement,
            self.whatsapp,
            self.source,
            self.completeness,
            self.lead_age,
        ]
    }
}

/// The seven weighted categories the aggregator blends the criteria into.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryBlends {
    pub contact: f64,
    pub business: f64,
    pub location: f64,
    pub niche: f64,
    pub engagement: f64,
    pub whatsapp: f64,
    pub data_quality: f64,
}

/// Audit trail for a heuristic score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
    pub criteria: CriteriaScores,
    pub blends: CategoryBlends,
    pub weights: ScoringWeights,
    pub weighted_score: f64,
}

/// Attribution copied from the external score that was surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAttribution {
    pub rationale: Option<String>,
    pub confidence: Option<f64>,
    pub model: Option<String>,
    pub scored_at: DateTime<Utc>,
}

/// A lead with its surfaced score. Recomputed on every scoring pass, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLead {
    #[serde(flatten)]
    pub lead: Lead,
    /// Final score in 0-10, one decimal place.
    pub score: f64,
    pub score_source: ScoreSource,
    pub tier: ScoreTier,
    /// Present when `score_source` is heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_breakdown: Option<ScoringBreakdown>,
    /// Present when `score_source` is ai.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiAttribution>,
}

/// min/avg/max summary over a set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

/// Bucket counts over the four score tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

/// Summary of one scored batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub overall: ScoreSummary,
    pub ai: Option<ScoreSummary>,
    pub heuristic: Option<ScoreSummary>,
    pub distribution: ScoreDistribution,
    /// Share of leads whose score came from the external scorer, in percent.
    pub ai_coverage_percent: f64,
}

// ============ API Request/Response Models ============

/// Request payload for scoring a batch of leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub external_scores: Vec<ExternalScore>,
    /// Optional partial override of the default weights.
    #[serde(default)]
    pub weights: Option<ScoringWeightsOverride>,
    #[serde(default = "default_true")]
    pub include_statistics: bool,
}

fn default_true() -> bool {
    true
}

/// Response payload for a scored batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub scored_leads: Vec<ScoredLead>,
    pub statistics: Option<AggregateStatistics>,
}

/// Query parameters for `GET /api/v1/leads/scores`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredLeadsQuery {
    pub status: Option<String>,
    pub city: Option<String>,
    pub min_score: Option<f64>,
    pub tier: Option<String>,
    pub source: Option<String>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_locale_variants() {
        assert_eq!(LeadStatus::parse("Novo"), LeadStatus::New);
        assert_eq!(LeadStatus::parse(" QUALIFICADO "), LeadStatus::Qualified);
        assert_eq!(LeadStatus::parse("canceled"), LeadStatus::Cancelled);
        assert_eq!(LeadStatus::parse("fechado"), LeadStatus::Closed);
        assert_eq!(
            LeadStatus::parse("waiting"),
            LeadStatus::Other("waiting".to_string())
        );
    }

    #[test]
    fn test_status_serde_round_trip_keeps_unknown_value() {
        let status: LeadStatus = serde_json::from_str("\"em negociação\"").unwrap();
        assert_eq!(status, LeadStatus::Other("em negociação".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"em negociação\"");
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(ScoreTier::from_score(8.0), ScoreTier::Excellent);
        assert_eq!(ScoreTier::from_score(7.9), ScoreTier::Good);
        assert_eq!(ScoreTier::from_score(6.0), ScoreTier::Good);
        assert_eq!(ScoreTier::from_score(5.9), ScoreTier::Fair);
        assert_eq!(ScoreTier::from_score(4.0), ScoreTier::Fair);
        assert_eq!(ScoreTier::from_score(3.9), ScoreTier::Poor);
    }

    #[test]
    fn test_lead_deserializes_with_missing_optional_fields() {
        let lead: Lead = serde_json::from_value(serde_json::json!({
            "id": "lead-1",
            "created_at": "2026-01-10T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.phone.is_none());
        assert!(!lead.whatsapp_verified);
        assert!(lead.business_name.is_empty());
    }
}
