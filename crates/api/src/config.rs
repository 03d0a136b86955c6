//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{DeliveryTier, PricingConfig, TaxRate};
use thiserror::Error;

use crate::sessions::SessionLimits;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid TAX_RATE_BPS value '{0}': expected a whole number of basis points")]
    InvalidTaxRate(String),

    #[error("Invalid DELIVERY_TIERS value: {0}")]
    InvalidDeliveryTiers(#[from] serde_json::Error),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL for cart persistence; in-memory when unset
/// - `TAX_RATE_BPS`: sales tax in basis points (default: `1500`)
/// - `DELIVERY_TIERS`: JSON array of tiers with prices in cents
/// - `SESSION_IDLE_SECS`: idle time before a cart engine is evicted (default: `1800`)
/// - `MAX_OPEN_SESSIONS`: cart engines kept in memory at most (default: `10000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub pricing: PricingConfig,
    pub sessions: SessionLimits,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tax_rate = match lookup("TAX_RATE_BPS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(TaxRate::from_basis_points)
                .map_err(|_| ConfigError::InvalidTaxRate(raw))?,
            None => defaults.pricing.tax_rate,
        };

        let delivery_tiers = match lookup("DELIVERY_TIERS") {
            Some(raw) => serde_json::from_str::<Vec<DeliveryTier>>(&raw)?,
            None => defaults.pricing.delivery_tiers,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            pricing: PricingConfig::new(tax_rate, delivery_tiers),
            sessions: SessionLimits {
                idle_timeout: lookup("SESSION_IDLE_SECS")
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.sessions.idle_timeout),
                max_sessions: lookup("MAX_OPEN_SESSIONS")
                    .and_then(|n| n.parse().ok())
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(defaults.sessions.max_sessions),
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            pricing: PricingConfig::default(),
            sessions: SessionLimits::default(),
        }
    }
}
