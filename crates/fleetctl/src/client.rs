//! HTTP client for fleetd

use anyhow::{anyhow, Context, Result};
use fleet_common::{GenerateRequest, GenerateResponse};
use serde_json::Value;

/// POST the request to `/generate`
pub async fn generate(base_url: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
    let url = format!("{}/generate", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .json(request)
        .send()
        .await
        .with_context(|| format!("Failed to reach fleetd at {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("no details");
        return Err(anyhow!("fleetd returned {}: {}", status, message));
    }

    response
        .json()
        .await
        .context("fleetd returned an unexpected response body")
}

/// GET `/health` as raw JSON
pub async fn health(base_url: &str) -> Result<Value> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to reach fleetd at {}", url))?;
    response
        .error_for_status()?
        .json()
        .await
        .context("Invalid health response")
}
