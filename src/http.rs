use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("related-events/", env!("CARGO_PKG_VERSION"));

pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    auth_token: String,
}

impl ApiClient {
    pub fn new(api_url: &str, auth_token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("GET {path} failed ({status}): {}", body.trim());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to parse response from {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_trimmed_base() {
        let client = ApiClient::new("https://sentry.example.com/", "token").unwrap();
        assert_eq!(
            client.url("/api/0/organizations/acme/"),
            "https://sentry.example.com/api/0/organizations/acme/"
        );
    }
}
