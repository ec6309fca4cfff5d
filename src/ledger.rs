//! Earnings ledger input: JSON rows or a CSV body, validated into `EarningsRecord`s.

use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

use crate::errors::AppError;
use crate::models::EarningsRecord;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "artist_id",
    "partner_name",
    "track_title",
    "earning_amount",
    "currency",
    "date",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A scalar that may arrive as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScalarInput {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ScalarInput {
    fn into_text(self) -> String {
        match self {
            ScalarInput::Integer(v) => v.to_string(),
            ScalarInput::Number(v) => v.to_string(),
            ScalarInput::Text(v) => v,
        }
    }
}

/// Ledger row as posted in a JSON body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JsonLedgerRow {
    pub artist_id: Option<ScalarInput>,
    pub partner_name: Option<String>,
    pub track_title: Option<String>,
    pub earning_amount: Option<ScalarInput>,
    pub currency: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LedgerRow {
    artist_id: Option<String>,
    partner_name: Option<String>,
    track_title: Option<String>,
    earning_amount: Option<String>,
    currency: Option<String>,
    date: Option<String>,
}

impl From<JsonLedgerRow> for LedgerRow {
    fn from(row: JsonLedgerRow) -> Self {
        Self {
            artist_id: row.artist_id.map(ScalarInput::into_text),
            partner_name: row.partner_name,
            track_title: row.track_title,
            earning_amount: row.earning_amount.map(ScalarInput::into_text),
            currency: row.currency,
            date: row.date,
        }
    }
}

pub fn records_from_json(rows: Vec<JsonLedgerRow>) -> Result<Vec<EarningsRecord>, AppError> {
    validate_rows(rows.into_iter().map(LedgerRow::from))
}

pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<EarningsRecord>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    // A body with no header row carries no rows either.
    if headers.iter().all(str::is_empty) {
        return Ok(Vec::new());
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Earnings CSV is missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let rows = csv_reader
        .deserialize::<LedgerRow>()
        .collect::<Result<Vec<_>, csv::Error>>()?;

    validate_rows(rows)
}

fn validate_rows(rows: impl IntoIterator<Item = LedgerRow>) -> Result<Vec<EarningsRecord>, AppError> {
    let mut records: Vec<EarningsRecord> = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        let record = validate_row(index + 1, row)?;
        if let Some(first) = records.first() {
            if first.artist_id != record.artist_id {
                return Err(AppError::BadRequest(format!(
                    "Row {}: ledger mixes artists '{}' and '{}'",
                    index + 1,
                    first.artist_id,
                    record.artist_id
                )));
            }
        }
        records.push(record);
    }

    tracing::debug!("Validated {} earnings record(s)", records.len());
    Ok(records)
}

fn validate_row(row_number: usize, row: LedgerRow) -> Result<EarningsRecord, AppError> {
    let amount_text = required(row_number, "earning_amount", row.earning_amount)?;
    let amount: f64 = amount_text.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Row {}: earning_amount '{}' is not numeric",
            row_number, amount_text
        ))
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::BadRequest(format!(
            "Row {}: earning_amount must be a non-negative number, got {}",
            row_number, amount_text
        )));
    }

    let date_text = required(row_number, "date", row.date)?;
    let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|e| {
        AppError::BadRequest(format!(
            "Row {}: date '{}' is not YYYY-MM-DD: {}",
            row_number, date_text, e
        ))
    })?;

    Ok(EarningsRecord {
        artist_id: required(row_number, "artist_id", row.artist_id)?,
        partner_name: required(row_number, "partner_name", row.partner_name)?,
        track_title: required(row_number, "track_title", row.track_title)?,
        amount,
        currency: required(row_number, "currency", row.currency)?,
        date,
    })
}

fn required(row_number: usize, field: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Row {}: missing required field '{}'",
                row_number, field
            ))
        })
}
