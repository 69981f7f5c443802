//! Certificate revocation.
//!
//! The revoked namespace and the CRL form one logical resource. Every write
//! to either goes through [`RevocationStore`] while holding its lock, so two
//! revocations can never interleave their CRL rebuilds. Reads of the CRL and
//! of issued certificates take no lock and may observe a CRL one revocation
//! behind.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::SshCaBackend;
use crate::crl::CrlBuilder;
use crate::error::Result;
use crate::error::SshCaError;
use crate::records::CertificateRecord;
use crate::records::cert_key;
use crate::records::load_json;
use crate::records::revoked_key;
use crate::records::save_json;
use crate::types::RevocationInfo;

/// Owns the issued-to-revoked transition and the CRL.
///
/// Share one instance (behind an `Arc`) per backend; the lock is scoped to
/// the instance and does not coordinate across processes.
pub struct RevocationStore {
    backend: Arc<dyn SshCaBackend>,
    crl: CrlBuilder,
    lock: Mutex<()>,
}

impl RevocationStore {
    /// Create a revocation store over `backend`.
    pub fn new(backend: Arc<dyn SshCaBackend>) -> Self {
        Self {
            crl: CrlBuilder::new(backend.clone()),
            backend,
            lock: Mutex::new(()),
        }
    }

    /// Revoke the certificate with `serial`.
    ///
    /// Idempotent: revoking an already-revoked serial returns the original
    /// timestamp. The CRL is left alone unless it is missing that
    /// certificate, in which case it is rebuilt. If the CRL rebuild fails the
    /// revocation itself stands and the error is returned; retrying the
    /// revocation or calling [`rebuild_crl`](Self::rebuild_crl) publishes it.
    pub async fn revoke(&self, serial: &str) -> Result<RevocationInfo> {
        if serial.trim().is_empty() {
            return Err(SshCaError::MissingField {
                field: "serial number".to_string(),
            });
        }

        let _guard = self.lock.lock().await;

        let revoked_path = revoked_key(serial);
        if let Some(existing) = load_json::<CertificateRecord>(self.backend.as_ref(), &revoked_path).await? {
            let revoked_at = existing.revocation.ok_or_else(|| SshCaError::CorruptedRecord {
                key: revoked_path.clone(),
                reason: "revoked entry has no revocation time".to_string(),
            })?;
            debug!(serial = %serial, "certificate already revoked");

            let crl = self.crl.current().await?;
            if !existing.certificate.is_empty() && !crl.lines().any(|line| line == existing.certificate) {
                info!(serial = %serial, "revoked certificate missing from CRL, rebuilding");
                self.crl.rebuild().await?;
            }
            return Ok(RevocationInfo::from_timestamp(revoked_at));
        }

        let issued: CertificateRecord = load_json(self.backend.as_ref(), &cert_key(serial))
            .await?
            .ok_or_else(|| SshCaError::CertificateNotFound {
                serial: serial.to_string(),
            })?;

        let revoked_at = Utc::now();
        save_json(self.backend.as_ref(), &revoked_path, &issued.revoked_at(revoked_at)).await?;
        info!(serial = %serial, "revoked SSH certificate");

        if let Err(e) = self.crl.rebuild().await {
            warn!(serial = %serial, error = %e, "certificate revoked but CRL rebuild failed");
            return Err(e);
        }

        Ok(RevocationInfo::from_timestamp(revoked_at))
    }

    /// Rebuild the CRL from the revoked namespace under the revocation lock.
    pub async fn rebuild_crl(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        self.crl.rebuild().await
    }

    /// The currently published CRL body. Takes no lock.
    pub async fn crl(&self) -> Result<String> {
        self.crl.current().await
    }
}
