//! Constants for the SSH CA secrets engine.
//!
//! Tiger Style: All limits are explicit and bounded to prevent unbounded
//! resource allocation from a single request.

// ============================================================================
// Storage Layout
// ============================================================================

/// Key prefix for role policies: `role/<name>`.
pub const ROLE_PREFIX: &str = "role/";

/// Key prefix for issued certificate records: `certs/<serial>`.
pub const CERTS_PREFIX: &str = "certs/";

/// Key prefix for revoked certificate records: `revoked/<serial>`.
pub const REVOKED_PREFIX: &str = "revoked/";

/// Key of the published certificate revocation list.
pub const CRL_KEY: &str = "crl";

/// Key of the CA public key (raw OpenSSH text).
pub const CA_PUBLIC_KEY_KEY: &str = "public_key";

/// Key of the CA private key (raw PEM text).
pub const CA_PRIVATE_KEY_KEY: &str = "config/ca_private_key";

/// Secret type registered with the hosting runtime for signed certificates.
pub const SECRET_CERTS_TYPE: &str = "sshca";

/// Internal-data field carrying the serial number of a leased certificate.
pub const SECRET_SERIAL_NUMBER_FIELD: &str = "serial_number";

/// Content type of the CRL and public key bodies.
pub const TEXT_PLAIN_CONTENT_TYPE: &str = "text/plain";

// ============================================================================
// Lease / TTL Defaults
// ============================================================================

/// System default lease TTL (24 hours).
pub const DEFAULT_LEASE_TTL_SECS: u64 = 24 * 3600;

/// System maximum lease TTL (32 days).
pub const DEFAULT_MAX_LEASE_TTL_SECS: u64 = 32 * 24 * 3600;

/// Back-dating applied to `valid_after` so freshly issued certificates are
/// accepted by hosts whose clocks run slightly behind.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 30;

/// Upper bound for the configurable clock skew tolerance.
pub const MAX_CLOCK_SKEW_SECS: u64 = 3600;

/// Placeholder shown when a role's max TTL is unset.
pub const SYSTEM_DEFAULT_PLACEHOLDER: &str = "(system default)";

/// Placeholder shown when a role's TTL is unset but its max TTL is set.
pub const SYSTEM_DEFAULT_CAPPED_PLACEHOLDER: &str = "(system default, capped to role max)";

// ============================================================================
// Request Limits
// ============================================================================

/// Maximum role name length.
pub const MAX_ROLE_NAME_LENGTH: usize = 128;

/// Maximum number of principals in a single certificate.
pub const MAX_PRINCIPALS_PER_CERT: usize = 256;

/// Maximum number of critical options or extensions in a single certificate.
pub const MAX_OPTIONS_PER_CERT: usize = 64;

/// Maximum length of a certificate key id.
pub const MAX_KEY_ID_LENGTH: usize = 256;

/// Default number of attempts to reserve a unique serial number.
pub const DEFAULT_MAX_SERIAL_ATTEMPTS: u32 = 8;

/// Hard ceiling on serial reservation attempts.
pub const MAX_SERIAL_ATTEMPTS_LIMIT: u32 = 64;
