use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::common::AccountId;
use crate::kernel::deps::MAX_FEE_BPS;
use crate::kernel::MarketSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the process runs on the in-memory store
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub webhook_secret: String,
    pub rapidapi_key: Option<String>,
    pub rapidapi_host: Option<String>,
    pub intent_ttl_secs: i64,
    pub platform_fee_bps: u32,
    pub fee_account_id: Option<AccountId>,
    pub payment_dedup_retention_days: i64,
    pub captcha_ttl_secs: i64,
    pub commit_retry_limit: u32,
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let fee_account_id = match env::var("FEE_ACCOUNT_ID") {
            Ok(raw) => Some(
                AccountId::parse(raw.trim()).context("FEE_ACCOUNT_ID must be a valid UUID")?,
            ),
            Err(_) => None,
        };

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            port: parsed_or("PORT", 8080)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "domain-market".to_string()),
            webhook_secret: env::var("WEBHOOK_SECRET").context("WEBHOOK_SECRET must be set")?,
            rapidapi_key: env::var("RAPIDAPI_KEY").ok(),
            rapidapi_host: env::var("RAPIDAPI_HOST").ok(),
            intent_ttl_secs: parsed_or("INTENT_TTL_SECS", 900)?,
            platform_fee_bps: parsed_or("PLATFORM_FEE_BPS", 0)?,
            fee_account_id,
            payment_dedup_retention_days: parsed_or("PAYMENT_DEDUP_RETENTION_DAYS", 90)?,
            captcha_ttl_secs: parsed_or("CAPTCHA_TTL_SECS", 300)?,
            commit_retry_limit: parsed_or("COMMIT_RETRY_LIMIT", 3)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.platform_fee_bps > MAX_FEE_BPS {
            bail!("PLATFORM_FEE_BPS must be at most 10000");
        }
        if self.platform_fee_bps > 0 && self.fee_account_id.is_none() {
            bail!("FEE_ACCOUNT_ID must be set when PLATFORM_FEE_BPS is above zero");
        }
        if self.intent_ttl_secs <= 0 {
            bail!("INTENT_TTL_SECS must be positive");
        }
        if self.captcha_ttl_secs <= 0 {
            bail!("CAPTCHA_TTL_SECS must be positive");
        }
        if self.payment_dedup_retention_days <= 0 {
            bail!("PAYMENT_DEDUP_RETENTION_DAYS must be positive");
        }
        if self.commit_retry_limit == 0 {
            bail!("COMMIT_RETRY_LIMIT must be at least 1");
        }
        Ok(())
    }

    pub fn market_settings(&self) -> MarketSettings {
        MarketSettings {
            intent_ttl: chrono::Duration::seconds(self.intent_ttl_secs),
            fee_bps: self.platform_fee_bps,
            fee_account: self.fee_account_id,
            commit_retry_limit: self.commit_retry_limit,
            dedup_retention: chrono::Duration::days(self.payment_dedup_retention_days),
        }
    }

    pub fn captcha_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.captcha_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            database_url: None,
            port: 8080,
            jwt_secret: "secret".into(),
            jwt_issuer: "domain-market".into(),
            webhook_secret: "hook".into(),
            rapidapi_key: None,
            rapidapi_host: None,
            intent_ttl_secs: 900,
            platform_fee_bps: 0,
            fee_account_id: None,
            payment_dedup_retention_days: 90,
            captcha_ttl_secs: 300,
            commit_retry_limit: 3,
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_fee_requires_fee_account() {
        let mut config = base();
        config.platform_fee_bps = 250;
        assert!(config.validate().is_err());

        config.fee_account_id = Some(AccountId::new());
        assert!(config.validate().is_ok());
        assert_eq!(config.market_settings().fee_for(1000), 25);
    }

    #[test]
    fn test_fee_capped_at_full_price() {
        let mut config = base();
        config.platform_fee_bps = 10_001;
        config.fee_account_id = Some(AccountId::new());
        assert!(config.validate().is_err());
    }
}
