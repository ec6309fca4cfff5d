/// Multi-channel candidate search against Salesforce.
///
/// Each identity channel (email, phone, name) runs one SOSL search over accounts.
/// A channel that fails is logged and skipped; hits are merged by record id with
/// the first occurrence kept.
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::{AccountStub, IdentityQuery};
use crate::normalize::normalize_phone;
use crate::salesforce_client::SalesforceClient;

const ACCOUNT_PROJECTION: &str = "Account(Id, Name, Payors_Funded_Text__c, Marketing_Status__pc)";

/// Characters SOSL treats as operators inside a FIND clause.
static SOSL_RESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([?&|!{}\[\]()^~*:\\"'+\-])"#).expect("SOSL reserved-character pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchChannel {
    Email,
    Phone,
    Name,
}

impl SearchChannel {
    fn field_group(self) -> &'static str {
        match self {
            SearchChannel::Email => "EMAIL",
            SearchChannel::Phone => "PHONE",
            SearchChannel::Name => "NAME",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchChannel::Email => "email",
            SearchChannel::Phone => "phone",
            SearchChannel::Name => "name",
        }
    }
}

/// Channels to search for a query, in issue order, with their search terms.
pub fn search_plan(query: &IdentityQuery) -> Vec<(SearchChannel, String)> {
    let mut plan = Vec::with_capacity(3);
    if let Some(email) = query.email() {
        plan.push((SearchChannel::Email, email.to_string()));
    }
    let phone = normalize_phone(query.cell());
    if !phone.is_empty() {
        plan.push((SearchChannel::Phone, phone));
    }
    if let Some(name) = query.name() {
        plan.push((SearchChannel::Name, name.to_string()));
    }
    plan
}

pub fn escape_sosl(term: &str) -> String {
    SOSL_RESERVED.replace_all(term, r"\$1").into_owned()
}

pub fn build_sosl(channel: SearchChannel, term: &str) -> String {
    format!(
        "FIND {{{}}} IN {} FIELDS RETURNING {}",
        escape_sosl(term),
        channel.field_group(),
        ACCOUNT_PROJECTION
    )
}

/// Searches every non-empty channel and returns the deduplicated account stubs.
pub async fn search_candidate_accounts(
    client: &SalesforceClient,
    query: &IdentityQuery,
) -> Vec<AccountStub> {
    let mut batches = Vec::new();

    for (channel, term) in search_plan(query) {
        match client.search(&build_sosl(channel, &term)).await {
            Ok(hits) => {
                tracing::info!("{} search returned {} account(s)", channel.label(), hits.len());
                batches.push(hits);
            }
            Err(e) => {
                tracing::warn!("❌ {} search failed, skipping channel: {}", channel.label(), e);
            }
        }
    }

    let merged = merge_candidates(batches);
    tracing::info!("{} distinct candidate account(s)", merged.len());
    merged
}

/// Flattens search batches, keeping the first stub seen for each record id.
pub fn merge_candidates(batches: impl IntoIterator<Item = Vec<AccountStub>>) -> Vec<AccountStub> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for stub in batches.into_iter().flatten() {
        let Some(id) = stub.id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        if seen.insert(id.to_string()) {
            merged.push(stub);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(id: Option<&str>, name: &str) -> AccountStub {
        AccountStub {
            id: id.map(str::to_string),
            name: Some(name.to_string()),
            partner_field: None,
            marketing_status: None,
        }
    }

    #[test]
    fn test_plan_orders_channels_and_normalizes_phone() {
        let query = IdentityQuery {
            user_id: Some("u".to_string()),
            full_name: Some("Jane Doe".to_string()),
            email_address: Some("jane@example.com".to_string()),
            cell_number: Some("+1 (555) 010-2030".to_string()),
            partner_name: None,
        };

        let plan = search_plan(&query);
        assert_eq!(
            plan,
            vec![
                (SearchChannel::Email, "jane@example.com".to_string()),
                (SearchChannel::Phone, "+15550102030".to_string()),
                (SearchChannel::Name, "Jane Doe".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_skips_blank_channels() {
        let query = IdentityQuery {
            user_id: Some("u".to_string()),
            full_name: Some("Jane".to_string()),
            email_address: Some("  ".to_string()),
            cell_number: Some("n/a".to_string()),
            partner_name: None,
        };

        let plan = search_plan(&query);
        assert_eq!(plan, vec![(SearchChannel::Name, "Jane".to_string())]);
    }

    #[test]
    fn test_sosl_escapes_reserved_characters() {
        assert_eq!(
            build_sosl(SearchChannel::Name, "Mary-Jane O'Neil"),
            "FIND {Mary\\-Jane O\\'Neil} IN NAME FIELDS RETURNING \
             Account(Id, Name, Payors_Funded_Text__c, Marketing_Status__pc)"
        );
        assert_eq!(escape_sosl("+1555"), "\\+1555");
        assert_eq!(escape_sosl("a}b{c"), "a\\}b\\{c");
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let merged = merge_candidates(vec![
            vec![stub(Some("001A"), "from email"), stub(None, "no id")],
            vec![stub(Some("001B"), "from phone"), stub(Some("001A"), "from phone")],
            vec![stub(Some("001A"), "from name"), stub(Some(""), "blank id")],
        ]);

        let ids: Vec<_> = merged.iter().map(|s| s.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["001A", "001B"]);
        assert_eq!(merged[0].name.as_deref(), Some("from email"));
    }
}
