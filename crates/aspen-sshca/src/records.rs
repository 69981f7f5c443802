//! Stored certificate records and JSON storage helpers.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::SshCaBackend;
use crate::constants::CERTS_PREFIX;
use crate::constants::REVOKED_PREFIX;
use crate::constants::ROLE_PREFIX;
use crate::error::Result;
use crate::error::SshCaError;

/// An issued (`certs/<serial>`) or revoked (`revoked/<serial>`) certificate.
///
/// Issued records are never mutated in place. Revocation writes a copy with
/// `revocation` set under the revoked namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Caller-visible serial number.
    #[serde(default)]
    pub serial_number: String,
    /// Signed certificate in OpenSSH format.
    #[serde(default)]
    pub certificate: String,
    /// Absolute expiry instant.
    pub valid_before: DateTime<Utc>,
    /// Revocation instant, unset until revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation: Option<DateTime<Utc>>,
}

impl CertificateRecord {
    /// A freshly issued, unrevoked record.
    pub fn issued(serial_number: impl Into<String>, certificate: impl Into<String>, valid_before: DateTime<Utc>) -> Self {
        Self {
            serial_number: serial_number.into(),
            certificate: certificate.into(),
            valid_before,
            revocation: None,
        }
    }

    /// A copy of this record stamped as revoked at `at`.
    pub fn revoked_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            revocation: Some(at),
            ..self.clone()
        }
    }
}

/// Storage key of an issued certificate.
pub fn cert_key(serial: &str) -> String {
    format!("{}{}", CERTS_PREFIX, serial)
}

/// Storage key of a revoked certificate.
pub fn revoked_key(serial: &str) -> String {
    format!("{}{}", REVOKED_PREFIX, serial)
}

/// Storage key of a role.
pub fn role_key(name: &str) -> String {
    format!("{}{}", ROLE_PREFIX, name)
}

/// Encode a record as JSON.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| SshCaError::Serialization { reason: e.to_string() })
}

/// Decode a JSON record read from `key`.
pub fn decode_json<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SshCaError::CorruptedRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Load and decode a JSON record.
pub async fn load_json<T: DeserializeOwned>(backend: &dyn SshCaBackend, key: &str) -> Result<Option<T>> {
    match backend.get(key).await? {
        Some(bytes) => decode_json(key, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Encode and store a JSON record.
pub async fn save_json<T: Serialize>(backend: &dyn SshCaBackend, key: &str, value: &T) -> Result<()> {
    let bytes = encode_json(value)?;
    backend.put(key, &bytes).await
}
