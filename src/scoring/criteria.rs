//! Criteria calculator
//!
//! Maps one lead to eleven independent sub-scores in 0-10. Every function here is total:
//! missing or malformed fields produce a low but valid score, never an error.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CriteriaScores, Lead, LeadStatus};
use crate::scoring::tables::ScoringTables;

// local@domain.tld, no whitespace
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static LEGAL_SUFFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ltda|eireli|epp|mei|me|s\.?a\.?|s/a)\.?\s*$").unwrap()
});

/// Computes the per-lead criteria against a set of lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaCalculator<'a> {
    tables: &'a ScoringTables,
}

impl<'a> CriteriaCalculator<'a> {
    pub fn new(tables: &'a ScoringTables) -> Self {
        Self { tables }
    }

    /// All eleven criteria for `lead`, with ages measured against `now`.
    pub fn calculate(&self, lead: &Lead, now: DateTime<Utc>) -> CriteriaScores {
        let completeness = self.completeness_score(lead);

        CriteriaScores {
            phone: self.phone_score(lead.phone.as_deref()),
            email: self.email_score(lead.email.as_deref()),
            business_name: self.business_name_score(&lead.business_name),
            city: self.city_score(&lead.city),
            niche: self.niche_score(lead.niche.as_deref()),
            response_time: self.response_time_score(&lead.status, lead.created_at, now),
            engagement: self.engagement_score(lead, completeness),
            whatsapp: self.whatsapp_score(lead),
            source: self.source_score(lead.source.as_deref()),
            completeness,
            lead_age: self.lead_age_score(lead.created_at, now),
        }
    }

    /// 0 when absent, 3 for an implausible length, 8 for 10-13 digits and
    /// 10 for an 11-digit mobile number in a known area code.
    pub fn phone_score(&self, phone: Option<&str>) -> f64 {
        let raw = match phone {
            Some(p) if !p.trim().is_empty() => p,
            _ => return 0.0,
        };

        let digits = digits_only(raw);
        if !(10..=13).contains(&digits.len()) {
            return 3.0;
        }

        let mut score = 8.0;
        if digits.len() == 11 && self.tables.is_mobile_area_code(&digits[..2]) {
            score += 2.0;
        }
        score
    }

    /// 0 when absent, 2 for a malformed address, 7 for webmail and 10 for a business domain.
    pub fn email_score(&self, email: Option<&str>) -> f64 {
        let email = match email.map(str::trim) {
            Some(e) if !e.is_empty() => e,
            _ => return 0.0,
        };

        if !EMAIL_PATTERN.is_match(email) {
            return 2.0;
        }

        let domain = email.rsplit('@').next().unwrap_or_default();
        if self.tables.is_webmail_domain(domain) {
            7.0
        } else {
            10.0
        }
    }

    pub fn business_name_score(&self, name: &str) -> f64 {
        let name = name.trim();
        let len = name.chars().count();
        if len < 3 {
            return 2.0;
        }

        let mut score: f64 = 5.0;

        if len > 30 {
            score += 2.0;
        } else if len > 15 {
            score += 1.5;
        } else if len > 8 {
            score += 1.0;
        }

        let lower = name.to_lowercase();
        if contains_any(&lower, &self.tables.professional_tokens) {
            score += 2.0;
        }

        if LEGAL_SUFFIX_PATTERN.is_match(name) {
            score += 1.0;
        }

        let starts_upper = name.chars().next().map_or(false, char::is_uppercase);
        if starts_upper && name != name.to_uppercase() {
            score += 0.5;
        }

        if contains_any(&lower, &self.tables.suspicious_tokens) {
            score = (score - 4.0).max(1.0);
        }

        score.min(10.0)
    }

    pub fn city_score(&self, city: &str) -> f64 {
        self.tables.cities.lookup(city)
    }

    pub fn niche_score(&self, niche: Option<&str>) -> f64 {
        match niche {
            Some(n) if !n.trim().is_empty() => self.tables.niches.lookup(n),
            _ => 5.0,
        }
    }

    pub fn whatsapp_score(&self, lead: &Lead) -> f64 {
        if !lead.whatsapp_verified && !lead.whatsapp_exists {
            return 5.0;
        }

        let mut score: f64 = 5.0;
        if lead.whatsapp_verified {
            score += 4.0;
        } else {
            score += 2.0;
        }

        if let Some(number) = lead.whatsapp_number.as_deref().filter(|n| !n.trim().is_empty()) {
            score += 1.0;

            let number_digits = digits_only(number);
            let phone_digits = lead.phone.as_deref().map(digits_only).unwrap_or_default();
            if !number_digits.is_empty() && number_digits == phone_digits {
                score += 1.0;
            }
        }

        score.min(10.0)
    }

    pub fn source_score(&self, source: Option<&str>) -> f64 {
        match source {
            Some(s) if !s.trim().is_empty() => self.tables.sources.lookup(s),
            _ => self.tables.sources.default,
        }
    }

    /// Share of the seven core fields that are filled, scaled to 0-10, with a
    /// one-point bonus (capped) when both phone and email are present.
    pub fn completeness_score(&self, lead: &Lead) -> f64 {
        let has_phone = is_filled(lead.phone.as_deref());
        let has_email = is_filled(lead.email.as_deref());

        let filled = [
            is_filled(Some(&lead.name)),
            is_filled(Some(&lead.business_name)),
            is_filled(Some(&lead.city)),
            has_phone,
            has_email,
            is_filled(lead.niche.as_deref()),
            is_filled(lead.source.as_deref()),
        ]
        .iter()
        .filter(|f| **f)
        .count();

        let mut score = filled as f64 / 7.0 * 10.0;
        if has_phone && has_email {
            score = (score + 1.0).min(10.0);
        }
        score
    }

    pub fn lead_age_score(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        bucket_score(&LEAD_AGE_BUCKETS, 1.0, hours_since(created_at, now))
    }

    /// New leads decay with waiting time; leads further down the funnel score by stage.
    pub fn response_time_score(
        &self,
        status: &LeadStatus,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> f64 {
        match status {
            LeadStatus::New => {
                bucket_score(&NEW_LEAD_WAIT_BUCKETS, 2.0, hours_since(created_at, now))
            }
            LeadStatus::Contacted => 7.0,
            LeadStatus::Qualified => 8.0,
            LeadStatus::Scheduled | LeadStatus::Proposal => 9.0,
            LeadStatus::Converted | LeadStatus::Closed => 10.0,
            LeadStatus::Lost => 3.0,
            LeadStatus::Cancelled => 2.0,
            LeadStatus::Other(_) => 5.0,
        }
    }

    /// Stage score plus contact bonuses, damped by data quality.
    pub fn engagement_score(&self, lead: &Lead, completeness: f64) -> f64 {
        let mut score: f64 = match lead.status {
            LeadStatus::New => 5.0,
            LeadStatus::Contacted => 6.0,
            LeadStatus::Qualified => 7.0,
            LeadStatus::Scheduled | LeadStatus::Proposal => 8.0,
            LeadStatus::Converted | LeadStatus::Closed => 10.0,
            LeadStatus::Lost => 2.0,
            LeadStatus::Cancelled => 1.0,
            LeadStatus::Other(_) => 5.0,
        };

        if is_filled(lead.phone.as_deref()) && is_filled(lead.email.as_deref()) {
            score += 1.0;
        }
        if lead.whatsapp_verified {
            score += 1.0;
        }
        if is_filled(lead.niche.as_deref()) {
            score += 0.5;
        }

        let quality_factor = 0.7 + 0.3 * (completeness / 10.0);
        round_one_decimal(score * quality_factor).clamp(0.0, 10.0)
    }

    /// Earliest instant after `now` at which a time-based criterion of `lead` moves to
    /// another bucket, or `None` once every bucket has been passed.
    pub fn next_bucket_change(&self, lead: &Lead, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut boundaries: Vec<i64> = LEAD_AGE_BUCKETS.iter().map(|(h, _)| *h).collect();
        if lead.status == LeadStatus::New {
            boundaries.extend(NEW_LEAD_WAIT_BUCKETS.iter().map(|(h, _)| *h));
        }

        boundaries
            .into_iter()
            .filter_map(|hours| lead.created_at.checked_add_signed(Duration::hours(hours)))
            .filter(|at| *at > now)
            .min()
    }
}

// (upper bound in hours, score); past the last bound the fallback applies
const LEAD_AGE_BUCKETS: [(i64, f64); 6] = [
    (1, 10.0),
    (6, 9.0),
    (24, 8.0),
    (72, 6.0),
    (168, 4.0),
    (720, 2.0),
];

const NEW_LEAD_WAIT_BUCKETS: [(i64, f64); 4] = [(1, 10.0), (4, 8.0), (24, 6.0), (72, 4.0)];

fn bucket_score(buckets: &[(i64, f64)], fallback: f64, hours: f64) -> f64 {
    buckets
        .iter()
        .find(|(bound, _)| hours < *bound as f64)
        .map_or(fallback, |(_, score)| *score)
}

/// Rounds half away from zero to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn is_filled(value: Option<&str>) -> bool {
    value.map_or(false, |v| !v.trim().is_empty())
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| !needle.is_empty() && haystack.contains(needle.as_str()))
}

fn hours_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - created_at).num_seconds() as f64;
    (seconds / 3600.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> Lead {
        Lead {
            id: "lead-1".to_string(),
            name: "Maria Silva".to_string(),
            business_name: "Silva Advocacia".to_string(),
            city: "São Paulo".to_string(),
            niche: Some("Advocacia".to_string()),
            phone: Some("(11) 98765-4321".to_string()),
            email: Some("maria@silvaadvocacia.com.br".to_string()),
            status: LeadStatus::New,
            source: Some("website".to_string()),
            whatsapp_verified: false,
            whatsapp_exists: false,
            whatsapp_number: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_phone_scores() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);

        assert_eq!(calc.phone_score(None), 0.0);
        assert_eq!(calc.phone_score(Some("   ")), 0.0);
        assert_eq!(calc.phone_score(Some("12345")), 3.0);
        assert_eq!(calc.phone_score(Some("(11) 98765-4321")), 10.0);
        // 11 digits but area code not in the allow-list
        assert_eq!(calc.phone_score(Some("(99) 98765-4321")), 8.0);
        // Landline, 10 digits
        assert_eq!(calc.phone_score(Some("(11) 3333-4444")), 8.0);
        assert_eq!(calc.phone_score(Some("+55 11 98765-4321")), 8.0);
        assert_eq!(calc.phone_score(Some("55119876543210")), 3.0);
    }

    #[test]
    fn test_email_scores() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);

        assert_eq!(calc.email_score(None), 0.0);
        assert_eq!(calc.email_score(Some("")), 0.0);
        assert_eq!(calc.email_score(Some("not-an-email")), 2.0);
        assert_eq!(calc.email_score(Some("user @example.com")), 2.0);
        assert_eq!(calc.email_score(Some("maria@gmail.com")), 7.0);
        assert_eq!(calc.email_score(Some("maria@GMAIL.com")), 7.0);
        assert_eq!(calc.email_score(Some("maria@silvaadvocacia.com.br")), 10.0);
    }

    #[test]
    fn test_business_name_heuristics() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);

        assert_eq!(calc.business_name_score("AB"), 2.0);
        assert_eq!(calc.business_name_score("Dra. Maria Silva Advocacia Ltda"), 10.0);
        assert_eq!(calc.business_name_score("teste123"), 1.0);
        // 5 base + 1 length + 0.5 capitalisation
        assert_eq!(calc.business_name_score("Padaria Pão"), 6.5);
        // All caps loses the capitalisation bonus
        assert_eq!(calc.business_name_score("PADARIA PÃO"), 6.0);
        assert_eq!(calc.business_name_score("Silva ME"), 6.5);
    }

    #[test]
    fn test_niche_and_city_defaults() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);

        assert_eq!(calc.niche_score(None), 5.0);
        assert_eq!(calc.niche_score(Some("  ")), 5.0);
        assert_eq!(calc.niche_score(Some("Advocacia")), 10.0);
        assert_eq!(calc.niche_score(Some("Psicologia")), 8.0);
        assert_eq!(calc.niche_score(Some("Padaria")), 6.0);
        assert_eq!(calc.niche_score(Some("Astrologia")), 5.0);
        assert_eq!(calc.city_score("Nowhereville"), 6.0);
    }

    #[test]
    fn test_whatsapp_scores() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let mut lead = lead();

        assert_eq!(calc.whatsapp_score(&lead), 5.0);

        lead.whatsapp_exists = true;
        assert_eq!(calc.whatsapp_score(&lead), 7.0);

        lead.whatsapp_number = Some("5511900000000".to_string());
        assert_eq!(calc.whatsapp_score(&lead), 8.0);

        lead.whatsapp_number = Some("11987654321".to_string());
        assert_eq!(calc.whatsapp_score(&lead), 9.0);

        lead.whatsapp_verified = true;
        assert_eq!(calc.whatsapp_score(&lead), 10.0);
    }

    #[test]
    fn test_completeness() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let full = lead();
        assert_eq!(calc.completeness_score(&full), 10.0);

        let mut sparse = lead();
        sparse.phone = None;
        sparse.niche = None;
        sparse.source = Some(" ".to_string());
        let expected = 4.0 / 7.0 * 10.0;
        assert!((calc.completeness_score(&sparse) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_lead_age_buckets() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let now = Utc::now();

        assert_eq!(calc.lead_age_score(now, now), 10.0);
        assert_eq!(calc.lead_age_score(now + Duration::hours(5), now), 10.0);
        assert_eq!(calc.lead_age_score(now - Duration::hours(2), now), 9.0);
        assert_eq!(calc.lead_age_score(now - Duration::hours(12), now), 8.0);
        assert_eq!(calc.lead_age_score(now - Duration::hours(48), now), 6.0);
        assert_eq!(calc.lead_age_score(now - Duration::days(5), now), 4.0);
        assert_eq!(calc.lead_age_score(now - Duration::days(20), now), 2.0);
        assert_eq!(calc.lead_age_score(now - Duration::days(60), now), 1.0);
    }

    #[test]
    fn test_next_bucket_change() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let now = Utc::now();
        let mut lead = lead();

        // New lead 2h old: the wait bucket flips at 4h, before the age bucket at 6h
        lead.created_at = now - Duration::hours(2);
        assert_eq!(
            calc.next_bucket_change(&lead, now),
            Some(lead.created_at + Duration::hours(4))
        );

        lead.status = LeadStatus::Qualified;
        assert_eq!(
            calc.next_bucket_change(&lead, now),
            Some(lead.created_at + Duration::hours(6))
        );

        lead.created_at = now - Duration::days(60);
        assert_eq!(calc.next_bucket_change(&lead, now), None);
    }

    #[test]
    fn test_response_time_by_status() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let now = Utc::now();
        let old = now - Duration::days(10);

        assert_eq!(calc.response_time_score(&LeadStatus::New, now, now), 10.0);
        assert_eq!(calc.response_time_score(&LeadStatus::New, old, now), 2.0);
        assert_eq!(calc.response_time_score(&LeadStatus::Qualified, old, now), 8.0);
        assert_eq!(calc.response_time_score(&LeadStatus::Proposal, old, now), 9.0);
        assert_eq!(calc.response_time_score(&LeadStatus::Closed, old, now), 10.0);
        assert_eq!(calc.response_time_score(&LeadStatus::Cancelled, old, now), 2.0);
        assert_eq!(
            calc.response_time_score(&LeadStatus::Other("pending".into()), old, now),
            5.0
        );
    }

    #[test]
    fn test_engagement_applies_bonuses_and_quality_factor() {
        let tables = ScoringTables::default();
        let calc = CriteriaCalculator::new(&tables);
        let mut lead = lead();
        lead.status = LeadStatus::Qualified;
        lead.whatsapp_verified = true;

        // 7 + 1 + 1 + 0.5 at full completeness
        assert_eq!(calc.engagement_score(&lead, 10.0), 9.5);
        // Zero completeness keeps 70% of 7 + 1 + 1
        lead.niche = None;
        assert_eq!(calc.engagement_score(&lead, 0.0), 6.3);

        lead.status = LeadStatus::Converted;
        assert_eq!(calc.engagement_score(&lead, 10.0), 10.0);
    }
}
