//! Lookup tables used by the criteria calculator.
//!
//! Every market-specific constant lives here as data so a different locale can ship
//! its own tables (see [`ScoringTables::from_json_file`]) without touching the
//! scoring algorithm.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Key → score mapping with a fallback for unmatched keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTable {
    pub scores: HashMap<String, f64>,
    pub default: f64,
    /// Match keys ignoring case. Keys are stored lowercased when set.
    #[serde(default)]
    pub case_insensitive: bool,
}

impl LookupTable {
    /// Builds an exact-match table from score tiers.
    pub fn from_tiers(tiers: &[(f64, &[&str])], default: f64) -> Self {
        let scores = tiers
            .iter()
            .flat_map(|(score, keys)| keys.iter().map(move |k| (k.to_string(), *score)))
            .collect();

        Self {
            scores,
            default,
            case_insensitive: false,
        }
    }

    /// Builds a case-insensitive table from `(key, score)` pairs.
    pub fn case_insensitive(entries: &[(&str, f64)], default: f64) -> Self {
        Self {
            scores: entries
                .iter()
                .map(|(k, score)| (k.to_lowercase(), *score))
                .collect(),
            default,
            case_insensitive: true,
        }
    }

    /// Score for `key` (trimmed), or the table default.
    pub fn lookup(&self, key: &str) -> f64 {
        let key = key.trim();
        let hit = if self.case_insensitive {
            self.scores.get(&key.to_lowercase())
        } else {
            self.scores.get(key)
        };
        hit.copied().unwrap_or(self.default)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn normalize_keys(&mut self) {
        if self.case_insensitive {
            self.scores = self
                .scores
                .drain()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect();
        }
    }
}

/// All tables the criteria calculator consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringTables {
    pub cities: LookupTable,
    pub niches: LookupTable,
    pub sources: LookupTable,
    /// Two-digit area codes (DDD) of mobile-capable metros.
    pub mobile_area_codes: Vec<String>,
    /// Consumer webmail domains; anything else reads as a business address.
    pub webmail_domains: Vec<String>,
    /// Substrings that suggest a professional or registered business.
    pub professional_tokens: Vec<String>,
    /// Substrings that mark test, sample or placeholder records.
    pub suspicious_tokens: Vec<String>,
}

impl ScoringTables {
    /// Loads tables from a JSON file. Omitted keys are not allowed; the file must be complete.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scoring tables {}: {}", path.display(), e))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let mut tables: ScoringTables = serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("Invalid scoring tables JSON: {}", e))?;
        tables.normalize();
        Ok(tables)
    }

    fn normalize(&mut self) {
        self.cities.normalize_keys();
        self.niches.normalize_keys();
        self.sources.normalize_keys();
        for list in [
            &mut self.webmail_domains,
            &mut self.professional_tokens,
            &mut self.suspicious_tokens,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.trim().to_lowercase();
            }
        }
    }

    pub fn is_mobile_area_code(&self, ddd: &str) -> bool {
        self.mobile_area_codes.iter().any(|code| code == ddd)
    }

    pub fn is_webmail_domain(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.webmail_domains.iter().any(|d| *d == domain)
    }
}

impl Default for ScoringTables {
    /// Brazilian market defaults.
    fn default() -> Self {
        Self {
            cities: LookupTable::from_tiers(
                &[
                    (
                        10.0,
                        &["São Paulo", "Rio de Janeiro", "Brasília", "Belo Horizonte"],
                    ),
                    (
                        9.0,
                        &[
                            "Curitiba",
                            "Porto Alegre",
                            "Salvador",
                            "Recife",
                            "Fortaleza",
                            "Campinas",
                            "Florianópolis",
                            "Goiânia",
                        ],
                    ),
                    (
                        8.0,
                        &[
                            "Manaus",
                            "Belém",
                            "Vitória",
                            "Natal",
                            "João Pessoa",
                            "Maceió",
                            "Santos",
                            "Ribeirão Preto",
                            "São José dos Campos",
                            "Sorocaba",
                            "Joinville",
                            "Londrina",
                            "Uberlândia",
                            "Campo Grande",
                            "Cuiabá",
                            "Niterói",
                            "Guarulhos",
                            "Osasco",
                            "Santo André",
                            "São Bernardo do Campo",
                        ],
                    ),
                ],
                6.0,
            ),
            niches: LookupTable::from_tiers(
                &[
                    (
                        10.0,
                        &[
                            "Advocacia",
                            "Medicina",
                            "Odontologia",
                            "Contabilidade",
                            "Arquitetura",
                            "Engenharia",
                            "Consultoria",
                            "Imobiliária",
                        ],
                    ),
                    (
                        8.0,
                        &[
                            "Clínica de Estética",
                            "Psicologia",
                            "Fisioterapia",
                            "Nutrição",
                            "Veterinária",
                            "Tecnologia",
                            "Marketing Digital",
                            "Educação",
                        ],
                    ),
                    (
                        6.0,
                        &[
                            "Academia",
                            "Restaurante",
                            "Salão de Beleza",
                            "Barbearia",
                            "Pet Shop",
                            "Loja de Roupas",
                            "Oficina Mecânica",
                            "Padaria",
                        ],
                    ),
                ],
                5.0,
            ),
            sources: LookupTable::case_insensitive(
                &[
                    ("referral", 10.0),
                    ("website", 9.0),
                    ("landing", 9.0),
                    ("google", 8.0),
                    ("facebook", 7.0),
                    ("webhook", 7.0),
                    ("import", 6.0),
                    ("manual", 5.0),
                ],
                5.0,
            ),
            mobile_area_codes: [
                "11", "12", "13", "19", "21", "27", "31", "41", "47", "48", "51", "61", "62", "71",
                "81", "85", "91", "92",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            webmail_domains: [
                "gmail.com",
                "hotmail.com",
                "outlook.com",
                "live.com",
                "yahoo.com",
                "yahoo.com.br",
                "icloud.com",
                "uol.com.br",
                "bol.com.br",
                "terra.com.br",
                "ig.com.br",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            professional_tokens: [
                "ltda",
                "eireli",
                "s.a.",
                "s/a",
                "advocacia",
                "advogados",
                "associados",
                "clínica",
                "clinica",
                "consultoria",
                "contabilidade",
                "engenharia",
                "arquitetura",
                "odontologia",
                "imobiliária",
                "imobiliaria",
                "tecnologia",
                "soluções",
                "solucoes",
                "serviços",
                "servicos",
                "comércio",
                "comercio",
                "indústria",
                "industria",
                "grupo",
                "dr.",
                "dra.",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            suspicious_tokens: [
                "teste",
                "test",
                "sample",
                "exemplo",
                "example",
                "fake",
                "placeholder",
                "asdf",
                "xxx",
                "lorem",
                "dummy",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_tiers() {
        let tables = ScoringTables::default();
        assert_eq!(tables.cities.lookup("São Paulo"), 10.0);
        assert_eq!(tables.cities.lookup("Curitiba"), 9.0);
        assert_eq!(tables.cities.lookup("Santos"), 8.0);
        assert_eq!(tables.cities.lookup("Nowhereville"), 6.0);
        // Exact match: different casing falls back to the default
        assert_eq!(tables.cities.lookup("são paulo"), 6.0);
    }

    #[test]
    fn test_case_insensitive_sources() {
        let tables = ScoringTables::default();
        assert_eq!(tables.sources.lookup("Referral"), 10.0);
        assert_eq!(tables.sources.lookup(" WEBSITE "), 9.0);
        assert_eq!(tables.sources.lookup("tiktok"), 5.0);
    }

    #[test]
    fn test_json_tables_replace_defaults() {
        let raw = r#"{
            "cities": {"scores": {"Lisboa": 10.0, "Porto": 9.0}, "default": 4.0},
            "niches": {"scores": {}, "default": 5.0},
            "sources": {"scores": {"Website": 7.0}, "default": 3.0, "case_insensitive": true},
            "mobile_area_codes": ["21"],
            "webmail_domains": ["Sapo.pt"],
            "professional_tokens": ["Lda"],
            "suspicious_tokens": ["teste"]
        }"#;

        let tables = ScoringTables::from_json_str(raw).unwrap();
        assert_eq!(tables.cities.lookup("Lisboa"), 10.0);
        assert_eq!(tables.cities.lookup("São Paulo"), 4.0);
        assert_eq!(tables.sources.lookup("website"), 7.0);
        assert!(tables.is_webmail_domain("SAPO.PT"));
        assert_eq!(tables.professional_tokens, vec!["lda".to_string()]);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(ScoringTables::from_json_str("{\"cities\": 1}").is_err());
    }
}
