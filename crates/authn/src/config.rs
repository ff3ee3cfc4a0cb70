//! Configuration for token issuance and validation.
//!
//! [`AuthConfig`] deserializes from any serde format with human-readable
//! durations (`"24h"`, `"5s"`) and can also be assembled with its builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tokensmith_authn::AuthConfig;
//!
//! let config = AuthConfig::builder()
//!     .issuer("my-service")
//!     .token_lifetime(Duration::from_secs(3600))
//!     .build();
//! config.validate()?;
//! # Ok::<(), tokensmith_authn::ConfigError>(())
//! ```

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "tokensmith";

/// Default signing key lifetime (24 hours).
pub const DEFAULT_KEY_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Default token validity used by [`SessionAuthenticator::issue_token`](crate::SessionAuthenticator::issue_token) (24 hours).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Default verification key cache capacity.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

/// Default verification key cache TTL (48 hours).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Default per-call key store timeout (5 seconds).
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest accepted verification cache TTL (365 days).
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required string field is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A numeric field is below its minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum accepted value.
        min: String,
        /// Value that was supplied.
        value: String,
    },

    /// A field is above its maximum.
    #[error("{field} must be at most {max}, got {value}")]
    AboveMaximum {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum accepted value.
        max: String,
        /// Value that was supplied.
        value: String,
    },

    /// A duration field is zero.
    #[error("{field} must be positive, got {value}")]
    MustBePositive {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: String,
    },

    /// A duration cannot be represented as a timestamp offset.
    #[error("{field} is out of range")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Returns `now + duration`, or [`ConfigError::OutOfRange`] if it does not fit.
pub(crate) fn checked_offset(
    now: DateTime<Utc>,
    duration: Duration,
    field: &'static str,
) -> Result<DateTime<Utc>, ConfigError> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(ConfigError::OutOfRange { field })
}

/// Token subsystem settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Value of the `iss` claim on issued tokens; validation requires it.
    #[serde(default = "default_issuer")]
    #[builder(into, default = default_issuer())]
    pub issuer: String,

    /// How long a newly generated signing key stays active for issuance.
    #[serde(with = "humantime_serde", default = "default_key_lifetime")]
    #[builder(default = DEFAULT_KEY_LIFETIME)]
    pub key_lifetime: Duration,

    /// Default validity of tokens issued by the session authenticator.
    #[serde(with = "humantime_serde", default = "default_token_lifetime")]
    #[builder(default = DEFAULT_TOKEN_LIFETIME)]
    pub token_lifetime: Duration,

    /// Maximum number of verification keys held in memory.
    #[serde(default = "default_cache_capacity")]
    #[builder(default = DEFAULT_CACHE_CAPACITY)]
    pub verification_cache_capacity: u64,

    /// How long a verification key stays cached after insertion.
    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    #[builder(default = DEFAULT_CACHE_TTL)]
    pub verification_cache_ttl: Duration,

    /// Upper bound on every key store call.
    #[serde(with = "humantime_serde", default = "default_store_timeout")]
    #[builder(default = DEFAULT_STORE_TIMEOUT)]
    pub store_timeout: Duration,
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_owned()
}

fn default_key_lifetime() -> Duration {
    DEFAULT_KEY_LIFETIME
}

fn default_token_lifetime() -> Duration {
    DEFAULT_TOKEN_LIFETIME
}

fn default_cache_capacity() -> u64 {
    DEFAULT_CACHE_CAPACITY
}

fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

fn default_store_timeout() -> Duration {
    DEFAULT_STORE_TIMEOUT
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AuthConfig {
    /// Checks every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty issuer, a zero or unrepresentably
    /// large duration, a cache TTL above [`MAX_CACHE_TTL`], or a zero cache
    /// capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Empty { field: "issuer" });
        }
        for (field, value) in [
            ("key_lifetime", self.key_lifetime),
            ("token_lifetime", self.token_lifetime),
            ("verification_cache_ttl", self.verification_cache_ttl),
            ("store_timeout", self.store_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::MustBePositive { field, value: "0s".into() });
            }
            checked_offset(Utc::now(), value, field)?;
        }
        if self.verification_cache_ttl > MAX_CACHE_TTL {
            return Err(ConfigError::AboveMaximum {
                field: "verification_cache_ttl",
                max: format!("{}s", MAX_CACHE_TTL.as_secs()),
                value: format!("{}s", self.verification_cache_ttl.as_secs()),
            });
        }
        if self.verification_cache_capacity == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "verification_cache_capacity",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }
}
