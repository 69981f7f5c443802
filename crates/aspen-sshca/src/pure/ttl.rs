//! TTL computation for roles and signed certificates.
//!
//! Role TTLs are clamped once, at write time:
//! `ttl <= max_ttl <= system max lease TTL` holds for every stored role.

use std::time::Duration;

use crate::error::Result;
use crate::error::SshCaError;

// ============================================================================
// Parsing / Formatting
// ============================================================================

/// Parse a human-readable duration such as `"15m"`, `"2h"` or `"24h0m0s"`.
///
/// Negative and malformed values are rejected with [`SshCaError::InvalidTtl`]
/// naming `field`.
pub fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    if trimmed.starts_with('-') {
        return Err(SshCaError::InvalidTtl {
            field: field.to_string(),
            reason: format!("'{}' is negative", trimmed),
        });
    }
    humantime::parse_duration(trimmed).map_err(|e| SshCaError::InvalidTtl {
        field: field.to_string(),
        reason: format!("'{}': {}", trimmed, e),
    })
}

/// Parse an optional duration string, treating empty as unset.
pub fn parse_optional_duration(field: &str, value: Option<&str>) -> Result<Option<Duration>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_duration(field, v).map(Some),
    }
}

/// Render a duration in canonical `<h>h<m>m<s>s` form.
///
/// Sub-second precision is dropped.
///
/// ```ignore
/// assert_eq!(format_duration(Duration::from_secs(86400)), "24h0m0s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

// ============================================================================
// Role TTL Clamping
// ============================================================================

/// Resolved role TTL pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleTtls {
    /// Default TTL for certificates signed under the role.
    pub ttl: Duration,
    /// Upper bound for certificates signed under the role.
    pub max_ttl: Duration,
}

/// Resolve a role's TTL pair against the system lease limits.
///
/// - Unset (or zero) `max_ttl` becomes the system max lease TTL.
/// - A `max_ttl` above the system max is rejected.
/// - Unset (or zero) `ttl` becomes the system default lease TTL, silently
///   clamped to `max_ttl`.
/// - An explicit `ttl` above `max_ttl` is rejected.
pub fn resolve_role_ttls(
    ttl: Option<Duration>,
    max_ttl: Option<Duration>,
    system_default_ttl: Duration,
    system_max_ttl: Duration,
) -> Result<RoleTtls> {
    let max_ttl = match max_ttl.filter(|d| !d.is_zero()) {
        Some(requested) => requested,
        None => system_max_ttl,
    };
    if max_ttl > system_max_ttl {
        return Err(SshCaError::MaxTtlExceedsSystem {
            requested_secs: max_ttl.as_secs(),
            max_secs: system_max_ttl.as_secs(),
        });
    }

    let ttl = match ttl.filter(|d| !d.is_zero()) {
        Some(explicit) if explicit > max_ttl => {
            return Err(SshCaError::TtlExceedsMaxTtl {
                ttl_secs: explicit.as_secs(),
                max_ttl_secs: max_ttl.as_secs(),
            });
        }
        Some(explicit) => explicit,
        None => system_default_ttl.min(max_ttl),
    };

    Ok(RoleTtls { ttl, max_ttl })
}

// ============================================================================
// Signing TTL
// ============================================================================

/// Effective certificate TTL: `min(requested, role ttl, role max ttl)`.
///
/// An absent or zero request means "use the role TTL".
#[inline]
pub fn effective_ttl(requested: Option<Duration>, role_ttl: Duration, role_max_ttl: Duration) -> Duration {
    let requested = requested.filter(|d| !d.is_zero()).unwrap_or(role_ttl);
    requested.min(role_ttl).min(role_max_ttl)
}

/// Certificate validity window in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// First second the certificate is valid (back-dated by the skew).
    pub valid_after: u64,
    /// First second the certificate is no longer valid.
    pub valid_before: u64,
}

/// Compute the validity window for a certificate signed at `now_unix_secs`.
///
/// The skew only moves the lower bound, so the nominal validity is
/// `ttl + clock_skew`.
#[inline]
pub fn compute_validity_window(now_unix_secs: u64, ttl: Duration, clock_skew: Duration) -> ValidityWindow {
    ValidityWindow {
        valid_after: now_unix_secs.saturating_sub(clock_skew.as_secs()),
        valid_before: now_unix_secs.saturating_add(ttl.as_secs()),
    }
}
