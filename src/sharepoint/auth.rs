use crate::config::Config;
use anyhow::Result;
use log::{debug, info};

/// Acquire a Graph access token with the client-credentials flow.
pub async fn acquire_token(http: &reqwest::Client, config: &Config) -> Result<String> {
    if config.tenant_id.is_empty() || config.client_id.is_empty() || config.client_secret.is_empty()
    {
        anyhow::bail!(
            "Missing credentials: set tenant-id, client-id and client-secret \
             (radar-cli config set ...) or the RADAR_* environment variables"
        );
    }

    let token_url = format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        config.tenant_id
    );
    info!("Requesting access token for tenant {}", config.tenant_id);

    let response = http
        .post(&token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("scope", "https://graph.microsoft.com/.default"),
        ])
        .send()
        .await?;

    debug!("Token request status: {}", response.status());

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Authentication failed: {}", error_text);
    }

    let token_data: serde_json::Value = response.json().await?;
    match token_data.get("access_token").and_then(|t| t.as_str()) {
        Some(access_token) => Ok(access_token.to_string()),
        None => anyhow::bail!("No access token in response"),
    }
}
