//! Royalty Advance API Library
//!
//! Prices royalty advances from artist earnings ledgers and resolves caller
//! identities to Salesforce accounts and their funded deals.
//!
//! # Modules
//!
//! - `api`: HTTP surface.
//! - `core`: Pricing and matching logic.
//! - `integrations`: Salesforce and the funding-config store.
//! - `advance`: Present value, payment schedule and quotes.
//! - `candidate_search`: Multi-channel SOSL search.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `enrichment`: Account detail queries.
//! - `errors`: Error handling types.
//! - `funding_config`: Partner funding-term lookup.
//! - `handlers`: HTTP request handlers.
//! - `ledger`: Earnings ledger parsing and validation.
//! - `matching`: Candidate scoring.
//! - `models`: Core data models.
//! - `normalize`: Comparison forms for names and phones.
//! - `revenue`: Trended annual revenue.
//! - `salesforce_auth`: Salesforce sessions (static or JWT bearer).
//! - `salesforce_client`: Salesforce REST data API client.

pub mod api;
pub mod core;
pub mod integrations;

pub mod advance;
pub mod candidate_search;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod errors;
pub mod funding_config;
pub mod handlers;
pub mod ledger;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod revenue;
pub mod salesforce_auth;
pub mod salesforce_client;
