use bigdecimal::{BigDecimal, ToPrimitive};
use sqlx::{FromRow, PgPool};

use crate::errors::{AppError, ResultExt};
use crate::models::{Frequency, FundingConfig};

/// Partners whose name contains the caller's text, shortest name first.
const PARTNER_FUNDING_SQL: &str = r#"
    SELECT pd.partner_name, fc.cushion, fc.decline_rate, fc.term_years,
           fc.frequency, fc.discount_rate
    FROM funding_config fc
    INNER JOIN partner_detail pd ON fc.partner_uuid = pd.partner_uuid
    WHERE LOWER(pd.partner_name) LIKE $1 ESCAPE '\'
    ORDER BY LENGTH(pd.partner_name) ASC
"#;

/// A funding-config row joined with its partner name.
#[derive(Debug, Clone, FromRow)]
pub struct PartnerFundingRow {
    pub partner_name: String,
    pub cushion: BigDecimal,
    pub decline_rate: BigDecimal,
    pub term_years: BigDecimal,
    pub frequency: String,
    pub discount_rate: BigDecimal,
}

impl PartnerFundingRow {
    fn to_funding_config(&self) -> Result<FundingConfig, AppError> {
        let decimal = |name: &str, value: &BigDecimal| {
            value.to_f64().ok_or_else(|| {
                AppError::CalculationError(format!(
                    "{} {} for partner '{}' is not representable",
                    name, value, self.partner_name
                ))
            })
        };

        Ok(FundingConfig {
            partner_name: self.partner_name.clone(),
            cushion: decimal("cushion", &self.cushion)?,
            decline_rate: decimal("decline_rate", &self.decline_rate)?,
            term_years: decimal("term_years", &self.term_years)?,
            frequency: Frequency::from_label(&self.frequency),
            discount_rate: decimal("discount_rate", &self.discount_rate)?,
        })
    }
}

/// Resolves the funding terms for the partner whose name best matches `partner_name`.
///
/// Matching is a case-insensitive substring test; among several matches the
/// shortest partner name wins, so "cinq" prefers "Cinq" over "Cinq Music".
pub async fn resolve_funding_config(
    pool: &PgPool,
    partner_name: &str,
) -> Result<FundingConfig, AppError> {
    let partner = partner_name.trim();
    if partner.is_empty() {
        return Err(AppError::BadRequest(
            "partner_name is required to resolve funding terms".to_string(),
        ));
    }

    let pattern = format!("%{}%", escape_like(&partner.to_lowercase()));
    let rows = sqlx::query_as::<_, PartnerFundingRow>(PARTNER_FUNDING_SQL)
        .bind(&pattern)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Looking up funding config for '{}'", partner))?;

    tracing::debug!("{} partner row(s) match '{}'", rows.len(), partner);

    let row = pick_most_specific(&rows).ok_or_else(|| {
        AppError::NotFound(format!(
            "No config found for partner similar to '{}'",
            partner
        ))
    })?;

    tracing::info!("Partner '{}' resolved to '{}'", partner, row.partner_name);
    row.to_funding_config()
}

/// The row with the shortest partner name; ties keep the first row.
pub fn pick_most_specific(rows: &[PartnerFundingRow]) -> Option<&PartnerFundingRow> {
    rows.iter().min_by_key(|row| row.partner_name.chars().count())
}

/// Escapes LIKE wildcards so the caller's text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
