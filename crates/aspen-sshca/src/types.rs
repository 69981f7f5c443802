//! Request and response types for the SSH CA engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SshCaError;
use crate::secret::LeasedSecret;

/// SSH certificate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertType {
    /// Certificate authenticating a user to a host.
    #[default]
    User,
    /// Certificate authenticating a host to a user.
    Host,
}

impl CertType {
    /// Lowercase name as used in requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertType::User => "user",
            CertType::Host => "host",
        }
    }
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertType {
    type Err = SshCaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(CertType::User),
            "host" => Ok(CertType::Host),
            _ => Err(SshCaError::InvalidCertType { value: s.to_string() }),
        }
    }
}

impl From<CertType> for ssh_key::certificate::CertType {
    fn from(value: CertType) -> Self {
        match value {
            CertType::User => ssh_key::certificate::CertType::User,
            CertType::Host => ssh_key::certificate::CertType::Host,
        }
    }
}

// ============================================================================
// CA Configuration
// ============================================================================

/// Request to install CA key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureCaRequest {
    /// CA public key: authorized-keys line or bare base64 blob.
    pub public_key: String,
    /// CA private key: OpenSSH or PKCS#1/PKCS#8 PEM.
    pub private_key: String,
}

// ============================================================================
// Signing
// ============================================================================

/// Request to sign a public key under a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignRequest {
    /// Role to sign under.
    pub role: String,
    /// Public key to certify: authorized-keys line or bare base64 blob.
    pub public_key: String,
    /// Key identifier embedded in the certificate. Defaults to the serial.
    pub key_id: Option<String>,
    /// Certificate type.
    pub cert_type: CertType,
    /// Requested principals. Empty yields a certificate valid for all principals.
    pub valid_principals: Vec<String>,
    /// Requested critical options. Empty means "use the role defaults".
    pub critical_options: BTreeMap<String, String>,
    /// Requested extensions. Empty means "use the role defaults".
    pub extensions: BTreeMap<String, String>,
    /// Requested TTL. `None` or zero means "use the role TTL".
    pub ttl: Option<Duration>,
}

impl SignRequest {
    /// Create a user-certificate request for `public_key` under `role`.
    pub fn new(role: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            public_key: public_key.into(),
            ..Default::default()
        }
    }

    /// Set the key id.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Set the certificate type.
    pub fn with_cert_type(mut self, cert_type: CertType) -> Self {
        self.cert_type = cert_type;
        self
    }

    /// Set the requested principals.
    pub fn with_principals<I, S>(mut self, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_principals = principals.into_iter().map(Into::into).collect();
        self
    }

    /// Add a critical option.
    pub fn with_critical_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.critical_options.insert(name.into(), value.into());
        self
    }

    /// Add an extension.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// Set the requested TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Result of a successful signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    /// Serial number of the issued certificate.
    pub serial_number: String,
    /// The signed certificate in OpenSSH format.
    pub signed_key: String,
    /// Absolute expiry of the certificate.
    pub valid_before: DateTime<Utc>,
    /// Lease the hosting runtime registers for automatic revocation.
    pub lease: LeasedSecret,
}

// ============================================================================
// Revocation
// ============================================================================

/// Revocation timestamp returned by `revoke`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationInfo {
    /// Revocation instant in Unix seconds.
    pub revocation_time: i64,
    /// Revocation instant in RFC3339 with nanoseconds.
    pub revocation_time_rfc3339: String,
}

impl RevocationInfo {
    /// Build from a revocation instant.
    pub fn from_timestamp(revoked_at: DateTime<Utc>) -> Self {
        Self {
            revocation_time: revoked_at.timestamp(),
            revocation_time_rfc3339: revoked_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

// ============================================================================
// Tidy
// ============================================================================

/// Request to prune expired certificate records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidyRequest {
    /// Prune the issued-certificate namespace.
    pub tidy_cert_store: bool,
    /// Prune the revoked-certificate namespace.
    pub tidy_revocation_list: bool,
    /// Grace period past expiry before a record may be deleted. Must be > 0.
    #[serde(with = "humantime_serde")]
    pub safety_buffer: Duration,
    /// Rebuild the CRL after pruning the revoked namespace.
    #[serde(default)]
    pub rebuild_crl: bool,
}

impl TidyRequest {
    /// Tidy both namespaces with the given buffer.
    pub fn all(safety_buffer: Duration) -> Self {
        Self {
            tidy_cert_store: true,
            tidy_revocation_list: true,
            safety_buffer,
            rebuild_crl: false,
        }
    }
}

/// Per-namespace tidy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTidyStats {
    /// Entries listed.
    pub scanned: usize,
    /// Entries deleted as expired past the buffer.
    pub deleted: usize,
    /// Entries kept.
    pub retained: usize,
}

/// Outcome of a tidy pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidyReport {
    /// Counters for `certs/`. `None` if not requested.
    pub cert_store: Option<NamespaceTidyStats>,
    /// Counters for `revoked/`. `None` if not requested.
    pub revocation_list: Option<NamespaceTidyStats>,
    /// Storage keys of records that could not be decoded. Never deleted.
    pub corrupt_keys: Vec<String>,
    /// Whether the CRL was rebuilt afterwards.
    pub crl_rebuilt: bool,
}

impl TidyReport {
    /// Total number of deleted entries across namespaces.
    pub fn total_deleted(&self) -> usize {
        self.cert_store.map_or(0, |s| s.deleted) + self.revocation_list.map_or(0, |s| s.deleted)
    }
}
