use serde::Deserialize;

use crate::scoring::arbiter::DEFAULT_FRESHNESS_DAYS;
use crate::scoring::tables::ScoringTables;
use crate::scoring::ScoringEngine;

/// Upper bound for `SCORE_CACHE_TTL_SECS`.
pub const MAX_SCORE_CACHE_TTL_SECS: u64 = 3_600;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Postgres URL; stored-lead scoring is disabled without it.
    pub database_url: Option<String>,
    /// JSON file replacing the built-in lookup tables.
    pub scoring_tables_path: Option<String>,
    pub score_cache_ttl_secs: u64,
    pub ai_score_max_age_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            scoring_tables_path: None,
            score_cache_ttl_secs: 60,
            ai_score_max_age_days: DEFAULT_FRESHNESS_DAYS,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            scoring_tables_path: std::env::var("SCORING_TABLES_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            score_cache_ttl_secs: std::env::var("SCORE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCORE_CACHE_TTL_SECS must be a number of seconds"))
                .and_then(|secs: u64| {
                    if secs > MAX_SCORE_CACHE_TTL_SECS {
                        anyhow::bail!(
                            "SCORE_CACHE_TTL_SECS must be at most {}",
                            MAX_SCORE_CACHE_TTL_SECS
                        );
                    }
                    Ok(secs)
                })?,
            ai_score_max_age_days: std::env::var("AI_SCORE_MAX_AGE_DAYS")
                .unwrap_or_else(|_| DEFAULT_FRESHNESS_DAYS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("AI_SCORE_MAX_AGE_DAYS must be a whole number"))
                .and_then(|days: i64| {
                    if days <= 0 {
                        anyhow::bail!("AI_SCORE_MAX_AGE_DAYS must be positive");
                    }
                    max_age_from_days(days)?;
                    Ok(days)
                })?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}...", redacted_url(url)),
            None => tracing::warn!("No DB_URL configured, stored-lead scoring disabled"),
        }
        if let Some(ref path) = config.scoring_tables_path {
            tracing::info!("Scoring tables override: {}", path);
        }
        tracing::debug!("Score cache TTL: {}s", config.score_cache_ttl_secs);
        tracing::debug!("AI score max age: {} days", config.ai_score_max_age_days);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the scoring engine, loading the lookup tables override when configured.
    pub fn build_engine(&self) -> anyhow::Result<ScoringEngine> {
        let tables = match self.scoring_tables_path {
            Some(ref path) => ScoringTables::from_json_file(path)?,
            None => ScoringTables::default(),
        };

        let max_age = max_age_from_days(self.ai_score_max_age_days)?;
        Ok(ScoringEngine::new(tables).with_max_ai_score_age(max_age))
    }
}

/// First 20 characters of a connection URL, for logs.
fn redacted_url(url: &str) -> String {
    url.chars().take(20).collect()
}

fn max_age_from_days(days: i64) -> anyhow::Result<chrono::Duration> {
    chrono::Duration::try_days(days)
        .ok_or_else(|| anyhow::anyhow!("AI_SCORE_MAX_AGE_DAYS is out of range: {}", days))
}
