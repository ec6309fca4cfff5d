use serde::Deserialize;
use sha2::{Digest, Sha256};

pub const DEFAULT_SALESFORCE_LOGIN_URL: &str = "https://test.salesforce.com";
pub const DEFAULT_SALESFORCE_API_VERSION: &str = "v60.0";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub api_key: String,
    pub salesforce_api_version: String,
    /// JWT audience and token endpoint host.
    pub salesforce_login_url: String,
    pub salesforce_client_id: Option<String>,
    pub salesforce_username: Option<String>,
    pub salesforce_private_key_path: Option<String>,
    /// Pre-issued session; when both are set the JWT flow is skipped.
    pub salesforce_access_token: Option<String>,
    pub salesforce_instance_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            api_key: std::env::var("API_KEY")
                .map_err(|_| anyhow::anyhow!("API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            salesforce_api_version: std::env::var("SF_API_VERSION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SALESFORCE_API_VERSION.to_string()),
            salesforce_login_url: std::env::var("SF_LOGIN_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SALESFORCE_LOGIN_URL.to_string()),
            salesforce_client_id: optional_var("SF_CLIENT_ID"),
            salesforce_username: optional_var("SF_USERNAME"),
            salesforce_private_key_path: optional_var("SF_PRIVATE_KEY_PATH"),
            salesforce_access_token: optional_var("SF_ACCESS_TOKEN"),
            salesforce_instance_url: optional_var("SF_INSTANCE_URL"),
        };

        config.validate_salesforce()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database URL: {}...", url_prefix(&config.database_url));
        if config.uses_static_session() {
            tracing::info!("Salesforce: static session for {:?}", config.salesforce_instance_url);
        } else {
            tracing::info!(
                "Salesforce: JWT bearer flow against {}",
                config.salesforce_login_url
            );
        }
        tracing::info!("API key fingerprint: {}", config.api_key_fingerprint());
        tracing::debug!("Salesforce API version: {}", config.salesforce_api_version);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// True when a pre-issued access token and instance URL are both configured.
    pub fn uses_static_session(&self) -> bool {
        self.salesforce_access_token.is_some() && self.salesforce_instance_url.is_some()
    }

    /// Short digest prefix that identifies the key in logs without revealing it.
    pub fn api_key_fingerprint(&self) -> String {
        hex::encode(&Sha256::digest(self.api_key.as_bytes())[..4])
    }

    fn validate_salesforce(&self) -> anyhow::Result<()> {
        for url in [
            Some(&self.salesforce_login_url),
            self.salesforce_instance_url.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("Salesforce URL '{}' must start with http:// or https://", url);
            }
        }

        if self.uses_static_session() {
            return Ok(());
        }

        let missing: Vec<&str> = [
            ("SF_CLIENT_ID", &self.salesforce_client_id),
            ("SF_USERNAME", &self.salesforce_username),
            ("SF_PRIVATE_KEY_PATH", &self.salesforce_private_key_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            anyhow::bail!(
                "Salesforce credentials incomplete: set SF_ACCESS_TOKEN and SF_INSTANCE_URL, or {}",
                missing.join(", ")
            );
        }

        Ok(())
    }
}

/// First 20 characters of a URL, for logs.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}
