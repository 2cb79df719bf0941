use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::BaseAuthorityScore;

/// RapidAPI domain-authority client
pub struct RapidApiAuthorityClient {
    api_key: String,
    host: String,
    client: reqwest::Client,
}

/// Domain metrics response; providers vary in which field they fill
#[derive(Debug, Deserialize)]
struct AuthorityResponse {
    #[serde(default, alias = "da")]
    domain_authority: Option<f64>,
    #[serde(default)]
    result: Option<AuthorityResult>,
}

#[derive(Debug, Deserialize)]
struct AuthorityResult {
    #[serde(default, alias = "da")]
    domain_authority: Option<f64>,
}

impl AuthorityResponse {
    fn score(self) -> Option<f64> {
        self.domain_authority
            .or_else(|| self.result.and_then(|result| result.domain_authority))
    }
}

impl RapidApiAuthorityClient {
    pub const DEFAULT_HOST: &'static str = "domain-da-pa-check.p.rapidapi.com";

    pub fn new(api_key: String, host: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            host: host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            client,
        })
    }
}

#[async_trait]
impl BaseAuthorityScore for RapidApiAuthorityClient {
    async fn score(&self, domain: &str) -> Result<Option<f64>> {
        let url = format!("https://{}/", self.host);

        let response = self
            .client
            .get(&url)
            .query(&[("target", domain)])
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .send()
            .await
            .context("Failed to send authority score request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Authority score API error ({}): {}", status, body);
        }

        let parsed: AuthorityResponse = response
            .json()
            .await
            .context("Failed to parse authority score response")?;

        Ok(parsed.score())
    }
}

/// Lookup used when no provider key is configured
pub struct DisabledAuthorityScore;

#[async_trait]
impl BaseAuthorityScore for DisabledAuthorityScore {
    async fn score(&self, _domain: &str) -> Result<Option<f64>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_top_level_score() {
        let parsed: AuthorityResponse = serde_json::from_str(r#"{"da": 42.0}"#).unwrap();
        assert_eq!(parsed.score(), Some(42.0));
    }

    #[test]
    fn test_parses_nested_score() {
        let parsed: AuthorityResponse =
            serde_json::from_str(r#"{"result": {"domain_authority": 17.5}}"#).unwrap();
        assert_eq!(parsed.score(), Some(17.5));
    }

    #[test]
    fn test_missing_score_is_none() {
        let parsed: AuthorityResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert_eq!(parsed.score(), None);
    }
}
