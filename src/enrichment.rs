/// Account enrichment for identity resolution
///
/// Expands each searched account with its contacts and assignment deals:
/// 1. Validate the record id (it is spliced into SOQL)
/// 2. Run the detail query with the test-record and person-account filters
/// 3. Map the row into a `CandidateAccount`
///
/// Accounts the filters exclude, or whose detail query fails, are skipped.
use crate::errors::{AppError, ResultExt};
use crate::models::{AccountRecord, AccountStub, CandidateAccount};
use crate::salesforce_client::SalesforceClient;

/// Salesforce ids are 15 (case-sensitive) or 18 (case-safe) alphanumerics.
pub fn is_record_id(id: &str) -> bool {
    matches!(id.len(), 15 | 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn account_detail_soql(account_id: &str) -> String {
    format!(
        "SELECT Id, Name, Payors_Funded_Text__c, Marketing_Status__pc, \
         (SELECT Id, Email, MobilePhone FROM Contacts), \
         (SELECT Id, Funding_Date__c, Status_of_Deal__c, Type FROM Opportunities \
         WHERE Type LIKE '%Assignment%') \
         FROM Account \
         WHERE Id = '{}' \
         AND Test_Record__c = false \
         AND Test_Record__pc = false \
         AND IsPersonAccount = true",
        account_id
    )
}

/// Fetches one account with its related lists.
///
/// Returns `Ok(None)` when the id is malformed or the account is filtered out.
pub async fn enrich_account(
    client: &SalesforceClient,
    account_id: &str,
) -> Result<Option<CandidateAccount>, AppError> {
    if !is_record_id(account_id) {
        tracing::warn!("Skipping malformed Salesforce id '{}'", account_id);
        return Ok(None);
    }

    let rows: Vec<AccountRecord> = client
        .query(&account_detail_soql(account_id))
        .await
        .with_context(|| format!("Enriching account {}", account_id))?;

    match rows.into_iter().next() {
        Some(record) => Ok(Some(CandidateAccount::from(record))),
        None => {
            tracing::debug!("Account {} excluded by detail filters", account_id);
            Ok(None)
        }
    }
}

/// Enriches every stub in order.
///
/// A failed detail query drops that account and the rest are still enriched.
pub async fn enrich_candidates(
    client: &SalesforceClient,
    stubs: &[AccountStub],
) -> Vec<CandidateAccount> {
    let mut accounts = Vec::with_capacity(stubs.len());

    for id in stubs.iter().filter_map(|stub| stub.id.as_deref()) {
        match enrich_account(client, id).await {
            Ok(Some(account)) => accounts.push(account),
            Ok(None) => {}
            Err(e) => tracing::warn!("❌ Detail query for {} failed, skipping: {}", id, e),
        }
    }

    tracing::info!(
        "✓ Enriched {} of {} candidate account(s)",
        accounts.len(),
        stubs.len()
    );
    accounts
}
