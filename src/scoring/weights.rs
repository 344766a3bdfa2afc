use serde::{Deserialize, Serialize};

use crate::models::{CategoryBlends, CriteriaScores};
use crate::scoring::criteria::round_one_decimal;

/// Weight of each scoring category in the final score.
///
/// The defaults sum to 1.0. Custom weights are taken as given; keeping them normalized
/// is up to the caller (see [`ScoringWeights::is_normalized`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub contact_info: f64,
    pub business_profile: f64,
    pub location: f64,
    pub niche: f64,
    pub engagement: f64,
    pub whatsapp: f64,
    pub data_quality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            contact_info: 0.20,
            business_profile: 0.15,
            location: 0.10,
            niche: 0.15,
            engagement: 0.15,
            whatsapp: 0.10,
            data_quality: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.contact_info
            + self.business_profile
            + self.location
            + self.niche
            + self.engagement
            + self.whatsapp
            + self.data_quality
    }

    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() < 1e-6
    }

    /// Copy of these weights with every field set in `overrides` replaced.
    pub fn with_overrides(&self, overrides: &ScoringWeightsOverride) -> Self {
        Self {
            contact_info: overrides.contact_info.unwrap_or(self.contact_info),
            business_profile: overrides.business_profile.unwrap_or(self.business_profile),
            location: overrides.location.unwrap_or(self.location),
            niche: overrides.niche.unwrap_or(self.niche),
            engagement: overrides.engagement.unwrap_or(self.engagement),
            whatsapp: overrides.whatsapp.unwrap_or(self.whatsapp),
            data_quality: overrides.data_quality.unwrap_or(self.data_quality),
        }
    }
}

/// Partial weights supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringWeightsOverride {
    pub contact_info: Option<f64>,
    pub business_profile: Option<f64>,
    pub location: Option<f64>,
    pub niche: Option<f64>,
    pub engagement: Option<f64>,
    pub whatsapp: Option<f64>,
    pub data_quality: Option<f64>,
}

/// Combines the eleven criteria into one 0-10 score.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAggregator {
    weights: ScoringWeights,
}

impl WeightedAggregator {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Groups the criteria into the seven weighted categories.
    pub fn blend(criteria: &CriteriaScores) -> CategoryBlends {
        CategoryBlends {
            contact: (criteria.phone + criteria.email) / 2.0,
            business: criteria.business_name,
            location: criteria.city,
            niche: criteria.niche,
            engagement: (criteria.response_time + criteria.engagement) / 2.0,
            whatsapp: criteria.whatsapp,
            data_quality: (criteria.completeness + criteria.lead_age + criteria.source) / 3.0,
        }
    }

    /// Weighted sum of the blends, clamped to 0-10 and rounded to one decimal.
    pub fn aggregate(&self, blends: &CategoryBlends) -> f64 {
        let w = &self.weights;
        let raw = blends.contact * w.contact_info
            + blends.business * w.business_profile
            + blends.location * w.location
            + blends.niche * w.niche
            + blends.engagement * w.engagement
            + blends.whatsapp * w.whatsapp
            + blends.data_quality * w.data_quality;

        round_one_decimal(raw.clamp(0.0, 10.0))
    }

    pub fn score(&self, criteria: &CriteriaScores) -> f64 {
        self.aggregate(&Self::blend(criteria))
    }
}
