//! Certificate revocation list.
//!
//! The CRL is the newline-joined list of raw certificates in the revoked
//! namespace, regenerated in full on every rebuild. A rebuild that cannot
//! decode some revoked entry fails as a whole and leaves the previous CRL in
//! place: a CRL that silently omits a revoked certificate is worse than a
//! stale one.

use std::sync::Arc;

use tracing::debug;

use crate::backend::SshCaBackend;
use crate::constants::CRL_KEY;
use crate::constants::REVOKED_PREFIX;
use crate::error::Result;
use crate::error::SshCaError;
use crate::records::CertificateRecord;
use crate::records::decode_json;
use crate::records::revoked_key;

/// Builds and reads the published CRL.
#[derive(Clone)]
pub struct CrlBuilder {
    backend: Arc<dyn SshCaBackend>,
}

impl CrlBuilder {
    /// Create a CRL builder over `backend`.
    pub fn new(backend: Arc<dyn SshCaBackend>) -> Self {
        Self { backend }
    }

    /// Render the CRL body from the current revoked namespace without storing it.
    ///
    /// Entries that disappear between listing and loading (pruned by a
    /// concurrent tidy) are skipped.
    pub async fn render(&self) -> Result<String> {
        let serials = self.backend.list(REVOKED_PREFIX).await?;
        let mut certificates = Vec::with_capacity(serials.len());

        for serial in serials.iter().filter(|s| !s.ends_with('/')) {
            let key = revoked_key(serial);
            let Some(bytes) = self.backend.get(&key).await? else {
                debug!(serial = %serial, "revoked entry vanished during CRL rebuild");
                continue;
            };
            let record: CertificateRecord = decode_json(&key, &bytes)?;
            certificates.push(record.certificate);
        }

        Ok(certificates.join("\n"))
    }

    /// Regenerate and store the CRL. Returns the number of entries.
    ///
    /// Callers must hold the revocation lock.
    pub(crate) async fn rebuild(&self) -> Result<usize> {
        let body = self.render().await?;
        let entries = if body.is_empty() { 0 } else { body.lines().count() };
        self.backend.put(CRL_KEY, body.as_bytes()).await?;
        debug!(entries, "rebuilt SSH CRL");
        Ok(entries)
    }

    /// The currently published CRL body; empty if none was ever built.
    pub async fn current(&self) -> Result<String> {
        match self.backend.get(CRL_KEY).await? {
            Some(bytes) => String::from_utf8(bytes).map_err(|e| SshCaError::CorruptedRecord {
                key: CRL_KEY.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(String::new()),
        }
    }
}
