//! Reconciler configuration

use bigdecimal::BigDecimal;
use std::env;
use std::str::FromStr;

use crate::types::*;

/// Environment variable overriding the amount tolerance
pub const AMOUNT_TOLERANCE_ENV: &str = "ACK_AMOUNT_TOLERANCE";

/// Absolute tolerance used when comparing monetary amounts (0.01)
pub fn default_amount_tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

/// Settings for [`crate::AcknowledgementReconciler`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// Maximum absolute difference accepted between a fully acknowledged
    /// amount and the invoice amount, and the slack allowed on the trip
    /// balance before a batch is rejected as exceeding it
    pub amount_tolerance: BigDecimal,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: default_amount_tolerance(),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> AckResult<Self> {
        match env::var(AMOUNT_TOLERANCE_ENV) {
            Ok(raw) => Self::default().with_tolerance_str(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Replace the tolerance with a parsed decimal value
    pub fn with_tolerance_str(self, raw: &str) -> AckResult<Self> {
        let tolerance = BigDecimal::from_str(raw.trim()).map_err(|e| {
            AckError::Configuration(format!("{AMOUNT_TOLERANCE_ENV} is not a decimal: {e}"))
        })?;

        if tolerance < BigDecimal::from(0) {
            return Err(AckError::Configuration(format!(
                "{AMOUNT_TOLERANCE_ENV} cannot be negative"
            )));
        }

        Ok(Self {
            amount_tolerance: tolerance,
        })
    }
}

/// PostgreSQL connection settings
#[cfg(feature = "postgres")]
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[cfg(feature = "postgres")]
impl DatabaseConfig {
    pub fn from_env() -> AckResult<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| AckError::Configuration("DATABASE_URL is required".to_string()))?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        })
    }
}
