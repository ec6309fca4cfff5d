//! Scores enriched candidate accounts against the caller's identity.
//!
//! Names and partners compare as normalized substrings, emails as lower-cased
//! substrings, and phones as exact trimmed strings. A candidate is kept when its
//! name, email or phone matches; partner agreement is reported only.

use crate::models::{CandidateAccount, IdentityQuery, IdentityResponse, MatchResult};
use crate::normalize::{contains_normalized, normalize_text};

/// Marketing status marking a missed-payment account.
pub const DELINQUENCY_STATUS: &str = "DNM - Delinquency";
/// Deal status of an executed advance.
pub const FUNDED_STATUS: &str = "Funded";

/// Caller fields in comparison form, computed once per request.
struct QueryKeys {
    name: String,
    email: String,
    cell: String,
    partner: String,
}

impl QueryKeys {
    fn from_query(query: &IdentityQuery) -> Self {
        Self {
            name: normalize_text(query.name()),
            email: query.email().map(str::to_lowercase).unwrap_or_default(),
            cell: query.cell().map(str::to_string).unwrap_or_default(),
            partner: normalize_text(query.partner()),
        }
    }
}

pub fn score_candidate<'a>(account: &'a CandidateAccount, query: &IdentityQuery) -> MatchResult<'a> {
    score_with_keys(account, &QueryKeys::from_query(query))
}

fn score_with_keys<'a>(account: &'a CandidateAccount, keys: &QueryKeys) -> MatchResult<'a> {
    let name_match = contains_normalized(&normalize_text(account.name.as_deref()), &keys.name);
    let partner_match = contains_normalized(
        &normalize_text(account.partner_field.as_deref()),
        &keys.partner,
    );

    let email_match = !keys.email.is_empty()
        && account.contacts.iter().any(|c| {
            c.email
                .as_deref()
                .is_some_and(|email| email.to_lowercase().contains(&keys.email))
        });

    let cell_match = !keys.cell.is_empty()
        && account
            .contacts
            .iter()
            .any(|c| c.phone.as_deref().is_some_and(|phone| phone.trim() == keys.cell));

    // First funded deal in enrichment order; no further ranking.
    let funded = account
        .opportunities
        .iter()
        .find(|o| o.status_of_deal.as_deref() == Some(FUNDED_STATUS));

    MatchResult {
        account,
        name_match,
        email_match,
        cell_match,
        partner_match,
        active: funded.is_some(),
        best_deal_id: funded.map(|o| o.id.as_str()),
        effective_date: funded.and_then(|o| o.funding_date),
        delinquency_flag: account.marketing_status.as_deref() == Some(DELINQUENCY_STATUS),
        primary_contact: account.contacts.iter().find(|c| c.has_email_or_phone()),
    }
}

/// Builds the deal-status payload for a set of enriched candidates.
///
/// Retained candidates keep their input order. When none is retained the result
/// is a single not-found entry.
pub fn resolve_identity(
    accounts: &[CandidateAccount],
    query: &IdentityQuery,
) -> Vec<IdentityResponse> {
    let keys = QueryKeys::from_query(query);

    let results: Vec<IdentityResponse> = accounts
        .iter()
        .map(|account| score_with_keys(account, &keys))
        .filter(|result| result.is_retained())
        .map(|result| IdentityResponse::found(&result, query))
        .collect();

    if results.is_empty() {
        tracing::info!(
            "No match among {} candidate(s) for user {:?}",
            accounts.len(),
            query.user_id
        );
        return vec![IdentityResponse::not_found(query)];
    }

    tracing::info!(
        "✓ {} of {} candidate(s) matched for user {:?}",
        results.len(),
        accounts.len(),
        query.user_id
    );
    results
}
