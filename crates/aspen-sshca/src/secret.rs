//! Leased secrets and the revocation capability.
//!
//! Every signed certificate is handed to the hosting runtime as a
//! [`LeasedSecret`]. When the lease expires or is revoked the runtime looks up
//! the [`Revocable`] registered for the secret's type and calls it without
//! knowing anything about certificates.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::SECRET_CERTS_TYPE;
use crate::constants::SECRET_SERIAL_NUMBER_FIELD;
use crate::error::Result;
use crate::error::SshCaError;
use crate::revocation::RevocationStore;
use crate::types::RevocationInfo;

/// A secret whose lifetime the hosting runtime tracks as a lease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeasedSecret {
    /// Secret type used to route revocation.
    pub secret_type: String,
    /// Lease duration.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Engine-private data needed to revoke the secret.
    pub internal_data: BTreeMap<String, serde_json::Value>,
}

impl LeasedSecret {
    /// Lease for a signed certificate.
    pub fn certificate(serial_number: &str, ttl: Duration) -> Self {
        let mut internal_data = BTreeMap::new();
        internal_data.insert(
            SECRET_SERIAL_NUMBER_FIELD.to_string(),
            serde_json::Value::String(serial_number.to_string()),
        );
        Self {
            secret_type: SECRET_CERTS_TYPE.to_string(),
            ttl,
            internal_data,
        }
    }

    /// Serial number carried in the internal data.
    pub fn serial_number(&self) -> Result<&str> {
        match self.internal_data.get(SECRET_SERIAL_NUMBER_FIELD) {
            Some(serde_json::Value::String(serial)) => Ok(serial),
            Some(_) => Err(SshCaError::InvalidSecret {
                reason: format!("{} is not a string", SECRET_SERIAL_NUMBER_FIELD),
            }),
            None => Err(SshCaError::InvalidSecret {
                reason: format!("could not find {} in internal secret data", SECRET_SERIAL_NUMBER_FIELD),
            }),
        }
    }
}

/// Capability to revoke a leased secret.
#[async_trait]
pub trait Revocable: Send + Sync {
    /// Secret type this implementation revokes.
    fn secret_type(&self) -> &'static str;

    /// Revoke the secret described by `secret`.
    async fn revoke(&self, secret: &LeasedSecret) -> Result<RevocationInfo>;
}

/// [`Revocable`] for signed SSH certificates.
#[derive(Clone)]
pub struct CertificateSecret {
    revocations: Arc<RevocationStore>,
}

impl CertificateSecret {
    /// Create the capability over a shared revocation store.
    pub fn new(revocations: Arc<RevocationStore>) -> Self {
        Self { revocations }
    }
}

#[async_trait]
impl Revocable for CertificateSecret {
    fn secret_type(&self) -> &'static str {
        SECRET_CERTS_TYPE
    }

    async fn revoke(&self, secret: &LeasedSecret) -> Result<RevocationInfo> {
        if secret.secret_type != SECRET_CERTS_TYPE {
            return Err(SshCaError::InvalidSecret {
                reason: format!("unexpected secret type '{}'", secret.secret_type),
            });
        }
        let serial = secret.serial_number()?;
        self.revocations.revoke(serial).await
    }
}
