use crate::advance::{closed_form_projection, quote_advance, round_cents};
use crate::candidate_search::search_candidate_accounts;
use crate::config::Config;
use crate::enrichment::enrich_candidates;
use crate::errors::AppError;
use crate::funding_config::resolve_funding_config;
use crate::ledger::{records_from_csv, records_from_json};
use crate::matching::resolve_identity;
use crate::models::*;
use crate::revenue::trended_annual_revenue;
use crate::salesforce_auth::SalesforceConnector;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;

/// Header carrying the caller's API key.
pub const ACCESS_KEY_HEADER: &str = "access-key";
/// Currency of the closed-form projection endpoint.
const PROJECTION_CURRENCY: &str = "USD";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (funding configs).
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Source of authenticated Salesforce clients.
    pub salesforce: SalesforceConnector,
}

/// Routes under `/api`, all guarded by the access key.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/royalty/advance-amount", post(advance_amount))
        .route("/api/royalty/advance-estimate", post(advance_estimate))
        .route("/api/royalty/advance-estimate/csv", post(advance_estimate_csv))
        .route("/api/royalty/deal-status", post(deal_status))
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "royalty-advance-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Rejects the request unless the `access-key` header matches the configured key.
pub fn verify_access_key(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get(ACCESS_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided.is_empty() || !constant_time_compare(provided, expected) {
        return Err(AppError::Forbidden("Invalid API Key".to_string()));
    }

    Ok(())
}

/// Compares SHA-256 digests so neither length nor content leaks through timing.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());

    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// POST /api/royalty/advance-amount
///
/// Flat projection from caller-supplied terms, without a ledger or funding config.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `headers` - Request headers (access key).
/// * `payload` - Trended revenue plus the funding terms to apply.
///
/// # Returns
///
/// * `Result<Json<AdvanceAmountResponse>, AppError>` - The echoed inputs and projected advance.
pub async fn advance_amount(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AdvanceAmountRequest>, JsonRejection>,
) -> Result<Json<AdvanceAmountResponse>, AppError> {
    verify_access_key(&headers, &state.config.api_key)?;
    let Json(request) = payload?;

    let projected = closed_form_projection(
        request.trended_annual,
        request.cushion,
        request.discount_rate,
        request.term_years,
    );
    if !projected.is_finite() {
        return Err(AppError::CalculationError(
            "projected advance is not a finite number".to_string(),
        ));
    }

    tracing::info!("POST /advance-amount - projected {:.2}", projected);

    Ok(Json(AdvanceAmountResponse {
        inputs: request,
        projected_advance: round_cents(projected),
        currency: PROJECTION_CURRENCY.to_string(),
    }))
}

/// POST /api/royalty/advance-estimate
///
/// Prices an advance from a JSON earnings ledger.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `headers` - Request headers (access key).
/// * `payload` - `{ "earnings": [...] }` with one object per ledger row.
///
/// # Returns
///
/// * `Result<Json<AdvanceResponse>, AppError>` - The priced advance or an error.
pub async fn advance_estimate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AdvanceEstimateRequest>, JsonRejection>,
) -> Result<Json<AdvanceResponse>, AppError> {
    verify_access_key(&headers, &state.config.api_key)?;
    let Json(request) = payload?;
    tracing::info!("POST /advance-estimate - {} row(s)", request.earnings.len());

    let records = records_from_json(request.earnings)?;
    let response = estimate_advance(&state.db, &records, Utc::now().date_naive()).await?;
    Ok(Json(response))
}

/// POST /api/royalty/advance-estimate/csv
///
/// Same as `advance_estimate`, with the ledger sent as a CSV body.
pub async fn advance_estimate_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<AdvanceResponse>, AppError> {
    verify_access_key(&headers, &state.config.api_key)?;
    tracing::info!("POST /advance-estimate/csv - {} byte(s)", body.len());

    let records = records_from_csv(body.as_bytes())?;
    let response = estimate_advance(&state.db, &records, Utc::now().date_naive()).await?;
    Ok(Json(response))
}

/// Trend, funding terms, present value and schedule for a validated ledger.
pub async fn estimate_advance(
    pool: &PgPool,
    records: &[EarningsRecord],
    today: NaiveDate,
) -> Result<AdvanceResponse, AppError> {
    let first = records.first().ok_or_else(|| {
        AppError::InsufficientData("no earnings records were supplied".to_string())
    })?;

    let config = resolve_funding_config(pool, &first.partner_name).await?;
    build_advance_response(records, &config, today)
}

/// Prices a ledger against already-resolved funding terms.
///
/// Artist, partner and currency come from the first row.
pub fn build_advance_response(
    records: &[EarningsRecord],
    config: &FundingConfig,
    today: NaiveDate,
) -> Result<AdvanceResponse, AppError> {
    let trend = trended_annual_revenue(records)?;
    let first = records.first().ok_or_else(|| {
        AppError::InsufficientData("no earnings records were supplied".to_string())
    })?;

    let quote = quote_advance(&trend, config, &first.currency, today)?;

    Ok(AdvanceResponse {
        artist_id: first.artist_id.clone(),
        partner_name: first.partner_name.clone(),
        projected_advance: quote.amount,
        currency: quote.currency,
        qualifies: quote.qualifies,
        trended_annual: round_cents(trend.trended_annual),
        first_assigned_payment_date: quote.schedule.first_payment_date,
        last_assigned_payment_date: quote.schedule.last_payment_date,
    })
}

/// POST /api/royalty/deal-status
///
/// Resolves a caller identity to Salesforce accounts and their funded deals.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `headers` - Request headers (access key).
/// * `payload` - Caller identity; `userId` and `fullName` are required.
///
/// # Returns
///
/// * `Result<Json<Vec<IdentityResponse>>, AppError>` - One entry per matched account,
///   or a single not-found entry.
pub async fn deal_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<IdentityQuery>, JsonRejection>,
) -> Result<Json<Vec<IdentityResponse>>, AppError> {
    verify_access_key(&headers, &state.config.api_key)?;
    let Json(query) = payload?;
    query.validate()?;
    tracing::info!("POST /deal-status - user {:?}", query.user_id);

    let client = state.salesforce.client().await?;
    let stubs = search_candidate_accounts(&client, &query).await;
    let accounts = enrich_candidates(&client, &stubs).await;

    Ok(Json(resolve_identity(&accounts, &query)))
}
