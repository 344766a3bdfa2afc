//! Lead Scoring API Library
//!
//! This library provides the lead-scoring core (criteria, weighted aggregation,
//! AI/heuristic score arbitration and batch statistics) together with the thin
//! service layer that exposes it over HTTP and reads stored leads from Postgres.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `cache_validator`: Request fingerprints and checksummed score cache entries.
//! - `circuit_breaker`: Circuit breaker for database calls.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `lead_store`: Stored leads and external scores.
//! - `models`: Lead, score and API data models.
//! - `scoring`: The scoring engine.

pub mod api;
pub mod core;

pub mod cache_validator;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod lead_store;
pub mod models;
pub mod scoring;
