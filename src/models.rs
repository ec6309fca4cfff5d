use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ledger::JsonLedgerRow;

/// Status reported when a candidate account survives matching.
pub const STATUS_FOUND: &str = "found";
/// Status of the synthetic result returned when nothing matches.
pub const STATUS_NOT_FOUND: &str = "not-found";
/// Identifier placeholder used by the synthetic not-found result.
pub const NOT_FOUND_SENTINEL: &str = "N/A";
/// Record store every identity result originates from.
pub const SOURCE_SYSTEM: &str = "Salesforce";

// ============ Advance Pricing ============

/// Payment frequency of an advance term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    /// Parses a stored frequency label.
    ///
    /// Labels match exactly; anything else falls back to `Monthly`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Monthly" => Frequency::Monthly,
            "Quarterly" => Frequency::Quarterly,
            "Annually" => Frequency::Annually,
            other => {
                tracing::warn!(
                    "Unrecognized payment frequency '{}', defaulting to Monthly",
                    other
                );
                Frequency::Monthly
            }
        }
    }

    pub fn periods_per_year(self) -> u32 {
        match self {
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::Annually => 1,
        }
    }
}

/// Pricing parameters resolved for one partner. Rates are fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingConfig {
    /// Partner record the lookup settled on.
    pub partner_name: String,
    pub cushion: f64,
    pub decline_rate: f64,
    pub term_years: f64,
    pub frequency: Frequency,
    pub discount_rate: f64,
}

impl FundingConfig {
    /// Whole payment periods in the term (`floor(term_years * periods_per_year)`).
    pub fn total_periods(&self) -> u32 {
        total_periods(self.term_years, self.frequency)
    }
}

pub fn total_periods(term_years: f64, frequency: Frequency) -> u32 {
    let periods = (term_years * f64::from(frequency.periods_per_year())).floor();
    if periods.is_finite() && periods > 0.0 {
        periods as u32
    } else {
        0
    }
}

/// One validated row of an artist's earnings ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsRecord {
    pub artist_id: String,
    pub partner_name: String,
    pub track_title: String,
    pub amount: f64,
    pub currency: String,
    pub date: NaiveDate,
}

/// Intermediate sums behind a trended annual revenue figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    pub latest_date: NaiveDate,
    pub six_month_total: f64,
    pub twelve_month_total: f64,
    /// `min(twelve_month_total, 2 * six_month_total)`.
    pub trended_annual: f64,
}

/// First and last assigned payment dates of an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSchedule {
    pub first_payment_date: NaiveDate,
    pub last_payment_date: NaiveDate,
}

/// A priced advance, created per request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceQuote {
    /// Present value rounded to cents.
    pub amount: f64,
    pub currency: String,
    pub qualifies: bool,
    pub schedule: PaymentSchedule,
}

/// Body of `POST /api/royalty/advance-amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceAmountRequest {
    pub trended_annual: f64,
    pub cushion: f64,
    pub decline_rate: f64,
    pub term_years: f64,
    pub frequency: String,
    pub discount_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceAmountResponse {
    pub inputs: AdvanceAmountRequest,
    pub projected_advance: f64,
    pub currency: String,
}

/// Body of `POST /api/royalty/advance-estimate`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvanceEstimateRequest {
    #[serde(default)]
    pub earnings: Vec<JsonLedgerRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub artist_id: String,
    pub partner_name: String,
    pub projected_advance: f64,
    pub currency: String,
    pub qualifies: bool,
    pub trended_annual: f64,
    pub first_assigned_payment_date: NaiveDate,
    pub last_assigned_payment_date: NaiveDate,
}

// ============ Identity Resolution ============

/// Caller-supplied identity for a deal-status lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityQuery {
    pub user_id: Option<String>,
    pub full_name: Option<String>,
    pub email_address: Option<String>,
    pub cell_number: Option<String>,
    pub partner_name: Option<String>,
}

impl IdentityQuery {
    /// Requires `userId` and `fullName`; the contact channels stay optional.
    pub fn validate(&self) -> Result<(), AppError> {
        if non_blank(self.user_id.as_deref()).is_none() {
            return Err(AppError::BadRequest("userId is required".to_string()));
        }
        if non_blank(self.full_name.as_deref()).is_none() {
            return Err(AppError::BadRequest("fullName is required".to_string()));
        }
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        non_blank(self.full_name.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(self.email_address.as_deref())
    }

    pub fn cell(&self) -> Option<&str> {
        non_blank(self.cell_number.as_deref())
    }

    pub fn partner(&self) -> Option<&str> {
        non_blank(self.partner_name.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Contact sub-record of a candidate account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountContact {
    pub id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl AccountContact {
    pub fn has_email_or_phone(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            || self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Contract (opportunity) sub-record of a candidate account.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub id: String,
    pub deal_type: Option<String>,
    pub status_of_deal: Option<String>,
    pub funding_date: Option<NaiveDate>,
}

/// An account found by search and expanded with its contacts and assignment deals.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAccount {
    pub id: String,
    pub name: Option<String>,
    /// Partners the account has been funded through (free text).
    pub partner_field: Option<String>,
    pub marketing_status: Option<String>,
    pub contacts: Vec<AccountContact>,
    pub opportunities: Vec<Opportunity>,
}

/// Outcome of scoring one candidate against an identity query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub account: &'a CandidateAccount,
    pub name_match: bool,
    pub email_match: bool,
    pub cell_match: bool,
    pub partner_match: bool,
    pub active: bool,
    pub best_deal_id: Option<&'a str>,
    pub effective_date: Option<NaiveDate>,
    pub delinquency_flag: bool,
    pub primary_contact: Option<&'a AccountContact>,
}

impl MatchResult<'_> {
    /// Partner agreement alone never retains a candidate.
    pub fn is_retained(&self) -> bool {
        self.name_match || self.email_match || self.cell_match
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub status: String,
    pub active: bool,
    pub fullname_match: bool,
    pub email_match: bool,
    pub cell_number_match: bool,
    pub partner_match: bool,
    pub account_id: String,
    pub deal_id: Option<String>,
    pub source_system: String,
    pub effective_date: Option<NaiveDate>,
    pub user_id: Option<String>,
    pub full_name: Option<String>,
    pub email_address: Option<String>,
    pub cell_number: Option<String>,
    pub partner_name: Option<String>,
    pub delinquency_flag: bool,
}

impl IdentityResponse {
    /// Builds the payload for a retained candidate.
    ///
    /// Email and phone come from the caller when supplied, otherwise from the
    /// account's primary contact.
    pub fn found(result: &MatchResult<'_>, query: &IdentityQuery) -> Self {
        let primary = result.primary_contact;
        Self {
            status: STATUS_FOUND.to_string(),
            active: result.active,
            fullname_match: result.name_match,
            email_match: result.email_match,
            cell_number_match: result.cell_match,
            partner_match: result.partner_match,
            account_id: result.account.id.clone(),
            deal_id: result.best_deal_id.map(str::to_string),
            source_system: SOURCE_SYSTEM.to_string(),
            effective_date: result.effective_date,
            user_id: query.user_id.clone(),
            full_name: result.account.name.clone(),
            email_address: query
                .email()
                .map(str::to_string)
                .or_else(|| primary.and_then(|c| c.email.clone())),
            cell_number: query
                .cell()
                .map(str::to_string)
                .or_else(|| primary.and_then(|c| c.phone.clone())),
            partner_name: result.account.partner_field.clone(),
            delinquency_flag: result.delinquency_flag,
        }
    }

    /// The single synthetic result returned when no candidate is retained.
    pub fn not_found(query: &IdentityQuery) -> Self {
        Self {
            status: STATUS_NOT_FOUND.to_string(),
            active: false,
            fullname_match: false,
            email_match: false,
            cell_number_match: false,
            partner_match: false,
            account_id: NOT_FOUND_SENTINEL.to_string(),
            deal_id: Some(NOT_FOUND_SENTINEL.to_string()),
            source_system: SOURCE_SYSTEM.to_string(),
            effective_date: None,
            user_id: query.user_id.clone(),
            full_name: query.full_name.clone(),
            email_address: query.email_address.clone(),
            cell_number: query.cell_number.clone(),
            partner_name: query.partner_name.clone(),
            delinquency_flag: false,
        }
    }
}

// ============ Salesforce Records ============

/// A raw search hit, before enrichment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountStub {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Payors_Funded_Text__c")]
    pub partner_field: Option<String>,
    #[serde(rename = "Marketing_Status__pc")]
    pub marketing_status: Option<String>,
}

/// Response of the SOSL search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "searchRecords", default = "Vec::new")]
    pub search_records: Vec<AccountStub>,
}

/// One page of a SOQL query.
#[derive(Debug, Deserialize)]
pub struct QueryPage<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,
}

/// Related list nested in a SOQL row; Salesforce sends `null` when empty.
#[derive(Debug, Deserialize)]
pub struct RelatedRecords<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRecord {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "MobilePhone")]
    pub mobile_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpportunityRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Funding_Date__c")]
    pub funding_date: Option<NaiveDate>,
    #[serde(rename = "Status_of_Deal__c")]
    pub status_of_deal: Option<String>,
    #[serde(rename = "Type")]
    pub deal_type: Option<String>,
}

/// Account row of the enrichment query, with its two related lists.
#[derive(Debug, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Payors_Funded_Text__c")]
    pub partner_field: Option<String>,
    #[serde(rename = "Marketing_Status__pc")]
    pub marketing_status: Option<String>,
    #[serde(rename = "Contacts")]
    pub contacts: Option<RelatedRecords<ContactRecord>>,
    #[serde(rename = "Opportunities")]
    pub opportunities: Option<RelatedRecords<OpportunityRecord>>,
}

impl From<AccountRecord> for CandidateAccount {
    fn from(record: AccountRecord) -> Self {
        let contacts = record
            .contacts
            .map(|list| list.records)
            .unwrap_or_default()
            .into_iter()
            .map(|c| AccountContact {
                id: c.id,
                email: c.email,
                phone: c.mobile_phone,
            })
            .collect();

        let opportunities = record
            .opportunities
            .map(|list| list.records)
            .unwrap_or_default()
            .into_iter()
            .map(|o| Opportunity {
                id: o.id,
                deal_type: o.deal_type,
                status_of_deal: o.status_of_deal,
                funding_date: o.funding_date,
            })
            .collect();

        Self {
            id: record.id,
            name: record.name,
            partner_field: record.partner_field,
            marketing_status: record.marketing_status,
            contacts,
            opportunities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frequency_labels() {
        assert_eq!(Frequency::from_label("Monthly"), Frequency::Monthly);
        assert_eq!(Frequency::from_label("Quarterly"), Frequency::Quarterly);
        assert_eq!(Frequency::from_label("Annually"), Frequency::Annually);
        assert_eq!(Frequency::from_label("Biweekly"), Frequency::Monthly);
        assert_eq!(Frequency::from_label(""), Frequency::Monthly);
    }

    #[test]
    fn test_frequency_labels_are_case_and_space_sensitive() {
        assert_eq!(Frequency::from_label("quarterly"), Frequency::Monthly);
        assert_eq!(Frequency::from_label(" Quarterly "), Frequency::Monthly);
        assert_eq!(Frequency::from_label(" Annually "), Frequency::Monthly);
        assert_eq!(Frequency::from_label("ANNUALLY"), Frequency::Monthly);
    }

    #[test]
    fn test_total_periods_floors() {
        assert_eq!(total_periods(2.0, Frequency::Monthly), 24);
        assert_eq!(total_periods(1.9, Frequency::Quarterly), 7);
        assert_eq!(total_periods(0.5, Frequency::Annually), 0);
        assert_eq!(total_periods(f64::NAN, Frequency::Monthly), 0);
    }

    #[test]
    fn test_identity_query_requires_user_and_name() {
        let mut query = IdentityQuery {
            user_id: Some("u-1".to_string()),
            full_name: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        assert!(query.validate().is_ok());

        query.full_name = Some("   ".to_string());
        assert!(matches!(query.validate(), Err(AppError::BadRequest(_))));

        query.full_name = Some("Jane".to_string());
        query.user_id = None;
        assert!(matches!(query.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_account_record_with_null_related_lists() {
        let raw = json!({
            "attributes": {"type": "Account"},
            "Id": "001000000000001AAA",
            "Name": "Jane Doe",
            "Payors_Funded_Text__c": null,
            "Marketing_Status__pc": "Active",
            "Contacts": null,
            "Opportunities": {
                "totalSize": 1,
                "done": true,
                "records": [{
                    "Id": "006000000000001AAA",
                    "Funding_Date__c": "2024-01-15",
                    "Status_of_Deal__c": "Funded",
                    "Type": "Royalty Assignment"
                }]
            }
        });

        let record: AccountRecord = serde_json::from_value(raw).unwrap();
        let account = CandidateAccount::from(record);

        assert!(account.contacts.is_empty());
        assert_eq!(account.opportunities.len(), 1);
        assert_eq!(
            account.opportunities[0].funding_date,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_identity_response_wire_names() {
        let query = IdentityQuery {
            user_id: Some("u-9".to_string()),
            full_name: Some("Nobody".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(IdentityResponse::not_found(&query)).unwrap();

        assert_eq!(value["status"], "not-found");
        assert_eq!(value["fullnameMatch"], false);
        assert_eq!(value["cellNumberMatch"], false);
        assert_eq!(value["dealId"], "N/A");
        assert_eq!(value["userId"], "u-9");
        assert_eq!(value["sourceSystem"], "Salesforce");
    }
}
