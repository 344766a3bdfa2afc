use chrono::{DateTime, Utc};
use failsafe::futures::CircuitBreaker;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::circuit_breaker::{create_db_circuit_breaker, DbCircuitBreaker};
use crate::errors::{AppError, ResultExt};
use crate::models::{ExternalScore, Lead, LeadStatus};

/// Hard cap on leads loaded per request.
pub const MAX_LEADS_PER_BATCH: i64 = 5_000;

/// Row shape of the `leads` table.
#[derive(Debug, Clone, FromRow)]
pub struct LeadRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub city: Option<String>,
    pub niche: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub whatsapp_verified: Option<bool>,
    pub whatsapp_exists: Option<bool>,
    pub whatsapp_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: row.id.to_string(),
            name: row.name.unwrap_or_default(),
            business_name: row.business_name.unwrap_or_default(),
            city: row.city.unwrap_or_default(),
            niche: row.niche,
            phone: row.phone,
            email: row.email,
            status: row
                .status
                .map(|s| LeadStatus::parse(&s))
                .unwrap_or_default(),
            source: row.source,
            whatsapp_verified: row.whatsapp_verified.unwrap_or(false),
            whatsapp_exists: row.whatsapp_exists.unwrap_or(false),
            whatsapp_number: row.whatsapp_number,
            created_at: row.created_at,
        }
    }
}

/// Row shape of `lead_ai_scores`.
#[derive(Debug, Clone, FromRow)]
pub struct AiScoreRow {
    pub lead_id: Uuid,
    pub score: f64,
    pub rationale: Option<String>,
    pub model: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<AiScoreRow> for ExternalScore {
    fn from(row: AiScoreRow) -> Self {
        ExternalScore {
            lead_id: row.lead_id.to_string(),
            score: row.score,
            rationale: row.rationale,
            model: row.model,
            confidence: row.confidence,
            created_at: row.created_at,
        }
    }
}

/// Read-only access to stored leads and their external scores.
#[derive(Clone)]
pub struct LeadStore {
    pool: PgPool,
    breaker: DbCircuitBreaker,
}

impl LeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            breaker: create_db_circuit_breaker(),
        }
    }

    /// Most recent leads first, optionally restricted to one city (case-insensitive).
    pub async fn fetch_leads(&self, city: Option<&str>, limit: i64) -> Result<Vec<Lead>, AppError> {
        let limit = limit.clamp(1, MAX_LEADS_PER_BATCH);

        let rows = self
            .breaker
            .call(
                sqlx::query_as::<_, LeadRow>(
                    r#"
                    SELECT id, name, business_name, city, niche, phone, email, status, source,
                           whatsapp_verified, whatsapp_exists, whatsapp_number, created_at
                    FROM leads
                    WHERE ($1::text IS NULL OR lower(city) = lower($1))
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#,
                )
                .bind(city)
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await
            .context("Fetching leads")?;

        tracing::debug!("Loaded {} lead(s) (city: {:?}, limit: {})", rows.len(), city, limit);
        Ok(rows.into_iter().map(Lead::from).collect())
    }

    /// Latest external score per lead, for the given lead ids only.
    pub async fn fetch_latest_ai_scores(
        &self,
        lead_ids: &[Uuid],
    ) -> Result<Vec<ExternalScore>, AppError> {
        if lead_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .breaker
            .call(
                sqlx::query_as::<_, AiScoreRow>(
                    r#"
                    SELECT DISTINCT ON (lead_id)
                           lead_id, score::float8 AS score, rationale, model,
                           confidence::float8 AS confidence, created_at
                    FROM lead_ai_scores
                    WHERE lead_id = ANY($1)
                    ORDER BY lead_id, created_at DESC
                    "#,
                )
                .bind(lead_ids)
                .fetch_all(&self.pool),
            )
            .await
            .context("Fetching AI scores")?;

        tracing::debug!(
            "Loaded {} AI score(s) for {} lead(s)",
            rows.len(),
            lead_ids.len()
        );
        Ok(rows.into_iter().map(ExternalScore::from).collect())
    }

    /// Leads plus their latest external scores, ready for the scoring engine.
    pub async fn load_batch(
        &self,
        city: Option<&str>,
        limit: i64,
    ) -> Result<(Vec<Lead>, Vec<ExternalScore>), AppError> {
        let leads = self.fetch_leads(city, limit).await?;

        let lead_ids: Vec<Uuid> = leads
            .iter()
            .filter_map(|lead| Uuid::parse_str(&lead.id).ok())
            .collect();
        let external_scores = self.fetch_latest_ai_scores(&lead_ids).await?;

        Ok((leads, external_scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_row_defaults_missing_columns() {
        let id = Uuid::new_v4();
        let row = LeadRow {
            id,
            name: None,
            business_name: Some("Silva Contabilidade".to_string()),
            city: None,
            niche: None,
            phone: Some("11987654321".to_string()),
            email: None,
            status: Some("Qualificado".to_string()),
            source: None,
            whatsapp_verified: None,
            whatsapp_exists: Some(true),
            whatsapp_number: None,
            created_at: Utc::now(),
        };

        let lead = Lead::from(row);
        assert_eq!(lead.id, id.to_string());
        assert_eq!(lead.status, LeadStatus::Qualified);
        assert!(lead.name.is_empty());
        assert!(!lead.whatsapp_verified);
        assert!(lead.whatsapp_exists);
    }

    #[test]
    fn test_null_status_defaults_to_new() {
        let row = LeadRow {
            id: Uuid::new_v4(),
            name: None,
            business_name: None,
            city: None,
            niche: None,
            phone: None,
            email: None,
            status: None,
            source: None,
            whatsapp_verified: None,
            whatsapp_exists: None,
            whatsapp_number: None,
            created_at: Utc::now(),
        };

        assert_eq!(Lead::from(row).status, LeadStatus::New);
    }
}
