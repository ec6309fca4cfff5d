//! Salesforce sessions: a configured static token or the OAuth 2.0 JWT bearer flow.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use moka::future::Cache;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::errors::AppError;
use crate::salesforce_client::{build_http_client, SalesforceClient, SalesforceSession};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime of the signed assertion, not of the issued session.
const ASSERTION_LIFETIME_SECS: i64 = 300;
/// Issued sessions are reused for this long before a fresh exchange.
const SESSION_TTL: Duration = Duration::from_secs(10 * 60);
const SESSION_KEY: &str = "session";

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
}

/// Connected-app credentials for the JWT bearer token exchange.
#[derive(Clone)]
pub struct JwtBearerAuth {
    login_url: String,
    client_id: String,
    username: String,
    signing_key: EncodingKey,
}

impl JwtBearerAuth {
    pub fn new(
        login_url: &str,
        client_id: &str,
        username: &str,
        private_key_pem: &[u8],
    ) -> Result<Self, AppError> {
        let signing_key = EncodingKey::from_rsa_pem(private_key_pem).map_err(|e| {
            AppError::InternalError(format!("Invalid Salesforce private key: {}", e))
        })?;

        Ok(Self {
            login_url: login_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            username: username.to_string(),
            signing_key,
        })
    }

    /// Signs the RS256 assertion presented to the token endpoint.
    pub fn assertion(&self, issued_at: i64) -> Result<String, AppError> {
        let claims = JwtClaims {
            iss: &self.client_id,
            sub: &self.username,
            aud: &self.login_url,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign JWT assertion: {}", e)))
    }

    /// Exchanges a fresh assertion for an access token.
    pub async fn request_session(
        &self,
        client: &reqwest::Client,
    ) -> Result<SalesforceSession, AppError> {
        let url = format!("{}/services/oauth2/token", self.login_url);
        let assertion = self.assertion(Utc::now().timestamp())?;
        tracing::info!("Requesting Salesforce session for {}", self.username);

        let response = client
            .post(&url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Salesforce token request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Failed to get Salesforce token ({}): {}",
                status, error_text
            )));
        }

        let session: SalesforceSession = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Salesforce token response: {}", e))
        })?;

        tracing::info!("✓ Salesforce session issued for {}", session.instance_url);
        Ok(session)
    }
}

#[derive(Clone)]
enum SessionSource {
    Static(SalesforceSession),
    JwtBearer(JwtBearerAuth),
}

/// Hands out authenticated `SalesforceClient`s.
#[derive(Clone)]
pub struct SalesforceConnector {
    http: reqwest::Client,
    source: SessionSource,
    api_version: String,
    sessions: Cache<&'static str, SalesforceSession>,
}

impl SalesforceConnector {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if let (Some(token), Some(instance_url)) = (
            &config.salesforce_access_token,
            &config.salesforce_instance_url,
        ) {
            let session = SalesforceSession {
                access_token: token.clone(),
                instance_url: instance_url.clone(),
            };
            return Ok(Self::with_static_session(
                session,
                &config.salesforce_api_version,
            )?);
        }

        let (Some(client_id), Some(username), Some(key_path)) = (
            &config.salesforce_client_id,
            &config.salesforce_username,
            &config.salesforce_private_key_path,
        ) else {
            anyhow::bail!("Salesforce JWT credentials are incomplete");
        };

        let pem = std::fs::read(key_path).map_err(|e| {
            anyhow::anyhow!("Failed to read Salesforce private key '{}': {}", key_path, e)
        })?;
        let auth = JwtBearerAuth::new(&config.salesforce_login_url, client_id, username, &pem)?;

        Ok(Self::with_jwt_bearer(auth, &config.salesforce_api_version)?)
    }

    pub fn with_static_session(
        session: SalesforceSession,
        api_version: &str,
    ) -> Result<Self, AppError> {
        Self::new(SessionSource::Static(session), api_version)
    }

    pub fn with_jwt_bearer(auth: JwtBearerAuth, api_version: &str) -> Result<Self, AppError> {
        Self::new(SessionSource::JwtBearer(auth), api_version)
    }

    fn new(source: SessionSource, api_version: &str) -> Result<Self, AppError> {
        Ok(Self {
            http: build_http_client()?,
            source,
            api_version: api_version.to_string(),
            sessions: Cache::builder()
                .time_to_live(SESSION_TTL)
                .max_capacity(1)
                .build(),
        })
    }

    /// Current session, exchanging a new JWT assertion when the cached one expired.
    pub async fn session(&self) -> Result<SalesforceSession, AppError> {
        match &self.source {
            SessionSource::Static(session) => Ok(session.clone()),
            SessionSource::JwtBearer(auth) => self
                .sessions
                .try_get_with(SESSION_KEY, auth.request_session(&self.http))
                .await
                .map_err(|e| (*e).clone()),
        }
    }

    pub async fn client(&self) -> Result<SalesforceClient, AppError> {
        let session = self.session().await?;
        Ok(SalesforceClient::new(
            self.http.clone(),
            session,
            &self.api_version,
        ))
    }
}
