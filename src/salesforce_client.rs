use crate::errors::AppError;
use crate::models::{AccountStub, QueryPage, SearchResponse};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Access token plus the org instance it is valid for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SalesforceSession {
    pub access_token: String,
    pub instance_url: String,
}

/// Builds the HTTP client shared by auth and data calls.
pub fn build_http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create Salesforce client: {}", e))
        })
}

/// Client for the Salesforce REST data API, bound to one session.
#[derive(Clone)]
pub struct SalesforceClient {
    client: reqwest::Client,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl SalesforceClient {
    pub fn new(client: reqwest::Client, session: SalesforceSession, api_version: &str) -> Self {
        Self {
            client,
            instance_url: session.instance_url.trim_end_matches('/').to_string(),
            access_token: session.access_token,
            api_version: api_version.to_string(),
        }
    }

    fn data_url(&self, resource: &str, query: &str) -> Result<Url, AppError> {
        Url::parse_with_params(
            &format!(
                "{}/services/data/{}/{}",
                self.instance_url, self.api_version, resource
            ),
            &[("q", query)],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))
    }

    /// Runs a SOSL search and returns the account hits.
    pub async fn search(&self, sosl: &str) -> Result<Vec<AccountStub>, AppError> {
        let url = self.data_url("search/", sosl)?;
        tracing::debug!("Salesforce search: {}", sosl);

        let response: SearchResponse = self.get_json(url, "search").await?;
        Ok(response.search_records)
    }

    /// Runs a SOQL query, following `nextRecordsUrl` until every page is read.
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, AppError> {
        let mut url = self.data_url("query", soql)?;
        let mut records = Vec::new();

        loop {
            let page: QueryPage<T> = self.get_json(url, "query").await?;
            records.extend(page.records);

            let Some(next) = page.next_records_url else {
                break;
            };
            url = Url::parse(&format!("{}{}", self.instance_url, next)).map_err(|e| {
                AppError::ExternalApiError(format!("Invalid nextRecordsUrl '{}': {}", next, e))
            })?;
            tracing::debug!("Fetching next query page: {}", next);
        }

        Ok(records)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, operation: &str) -> Result<T, AppError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Salesforce {} request failed: {}", operation, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Salesforce {} returned {}: {}",
                operation, status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Failed to parse Salesforce {} response: {}",
                operation, e
            ))
        })
    }
}
