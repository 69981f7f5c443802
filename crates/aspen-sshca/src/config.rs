//! Engine configuration.
//!
//! Models the lease limits the hosting runtime imposes on a mount plus the
//! operational knobs of the signer.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CLOCK_SKEW_SECS;
use crate::constants::DEFAULT_LEASE_TTL_SECS;
use crate::constants::DEFAULT_MAX_LEASE_TTL_SECS;
use crate::constants::DEFAULT_MAX_SERIAL_ATTEMPTS;
use crate::constants::MAX_CLOCK_SKEW_SECS;
use crate::constants::MAX_SERIAL_ATTEMPTS_LIMIT;
use crate::error::Result;
use crate::error::SshCaError;

/// Configuration for an SSH CA mount.
///
/// Durations are (de)serialized as human-readable strings (`"24h"`, `"30s"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshCaConfig {
    /// System default lease TTL, used when a role does not set `ttl`.
    #[serde(with = "humantime_serde")]
    pub default_lease_ttl: Duration,

    /// System maximum lease TTL; no role may exceed it.
    #[serde(with = "humantime_serde")]
    pub max_lease_ttl: Duration,

    /// How far `valid_after` is back-dated from the signing instant.
    #[serde(with = "humantime_serde")]
    pub clock_skew: Duration,

    /// Attempts to reserve a unique serial before giving up.
    pub max_serial_attempts: u32,
}

impl Default for SshCaConfig {
    fn default() -> Self {
        Self {
            default_lease_ttl: Duration::from_secs(DEFAULT_LEASE_TTL_SECS),
            max_lease_ttl: Duration::from_secs(DEFAULT_MAX_LEASE_TTL_SECS),
            clock_skew: Duration::from_secs(DEFAULT_CLOCK_SKEW_SECS),
            max_serial_attempts: DEFAULT_MAX_SERIAL_ATTEMPTS,
        }
    }
}

impl SshCaConfig {
    /// Set the system lease TTLs.
    pub fn with_lease_ttls(mut self, default_lease_ttl: Duration, max_lease_ttl: Duration) -> Self {
        self.default_lease_ttl = default_lease_ttl;
        self.max_lease_ttl = max_lease_ttl;
        self
    }

    /// Set the clock skew tolerance.
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_lease_ttl.is_zero() {
            return Err(SshCaError::InvalidConfig {
                reason: "max_lease_ttl must be greater than zero".to_string(),
            });
        }
        if self.default_lease_ttl > self.max_lease_ttl {
            return Err(SshCaError::InvalidConfig {
                reason: format!(
                    "default_lease_ttl {}s exceeds max_lease_ttl {}s",
                    self.default_lease_ttl.as_secs(),
                    self.max_lease_ttl.as_secs()
                ),
            });
        }
        if self.clock_skew.as_secs() > MAX_CLOCK_SKEW_SECS {
            return Err(SshCaError::InvalidConfig {
                reason: format!("clock_skew {}s exceeds maximum {}s", self.clock_skew.as_secs(), MAX_CLOCK_SKEW_SECS),
            });
        }
        if self.max_serial_attempts == 0 || self.max_serial_attempts > MAX_SERIAL_ATTEMPTS_LIMIT {
            return Err(SshCaError::InvalidConfig {
                reason: format!("max_serial_attempts must be in [1, {}]", MAX_SERIAL_ATTEMPTS_LIMIT),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SshCaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_lease_ttl, Duration::from_secs(86400));
        assert_eq!(config.clock_skew, Duration::from_secs(30));
    }

    #[test]
    fn test_default_above_max_rejected() {
        let config = SshCaConfig::default().with_lease_ttls(Duration::from_secs(7200), Duration::from_secs(3600));
        assert!(matches!(config.validate(), Err(SshCaError::InvalidConfig { .. })));
    }

    #[test]
    fn test_deserialize_human_durations() {
        let config: SshCaConfig =
            serde_json::from_str(r#"{"default_lease_ttl": "1h", "max_lease_ttl": "48h", "clock_skew": "10s"}"#)
                .unwrap();
        assert_eq!(config.default_lease_ttl, Duration::from_secs(3600));
        assert_eq!(config.max_lease_ttl, Duration::from_secs(48 * 3600));
        assert_eq!(config.clock_skew, Duration::from_secs(10));
        assert_eq!(config.max_serial_attempts, DEFAULT_MAX_SERIAL_ATTEMPTS);
    }
}
