//! Garbage collection of expired certificate records.
//!
//! Tidy takes no lock. It only deletes records that expired more than the
//! safety buffer ago, and it never deletes a record it cannot decode: an
//! unreadable revoked entry might be a certificate that still belongs on the
//! CRL, so it is reported instead.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::SshCaBackend;
use crate::constants::CERTS_PREFIX;
use crate::constants::REVOKED_PREFIX;
use crate::error::Result;
use crate::error::SshCaError;
use crate::pure::is_past_safety_buffer;
use crate::records::CertificateRecord;
use crate::records::decode_json;
use crate::revocation::RevocationStore;
use crate::types::NamespaceTidyStats;
use crate::types::TidyReport;
use crate::types::TidyRequest;

/// Prunes `certs/` and `revoked/`.
pub struct TidyJob {
    backend: Arc<dyn SshCaBackend>,
    revocations: Arc<RevocationStore>,
}

impl TidyJob {
    /// Create a tidy job. `revocations` is only used for the optional CRL rebuild.
    pub fn new(backend: Arc<dyn SshCaBackend>, revocations: Arc<RevocationStore>) -> Self {
        Self { backend, revocations }
    }

    /// Run a tidy pass at the current time.
    pub async fn run(&self, request: &TidyRequest) -> Result<TidyReport> {
        self.run_at(request, Utc::now()).await
    }

    /// Run a tidy pass as of `now`.
    pub async fn run_at(&self, request: &TidyRequest, now: DateTime<Utc>) -> Result<TidyReport> {
        if request.safety_buffer.is_zero() {
            return Err(SshCaError::InvalidSafetyBuffer {
                reason: "safety_buffer must be greater than zero".to_string(),
            });
        }

        let mut report = TidyReport::default();

        if request.tidy_cert_store {
            let stats = self.tidy_namespace(CERTS_PREFIX, request, now, &mut report.corrupt_keys).await?;
            report.cert_store = Some(stats);
        }

        if request.tidy_revocation_list {
            let stats = self.tidy_namespace(REVOKED_PREFIX, request, now, &mut report.corrupt_keys).await?;
            report.revocation_list = Some(stats);

            if request.rebuild_crl {
                self.revocations.rebuild_crl().await?;
                report.crl_rebuilt = true;
            }
        }

        info!(
            deleted = report.total_deleted(),
            corrupt = report.corrupt_keys.len(),
            crl_rebuilt = report.crl_rebuilt,
            "SSH CA tidy complete"
        );
        Ok(report)
    }

    async fn tidy_namespace(
        &self,
        prefix: &str,
        request: &TidyRequest,
        now: DateTime<Utc>,
        corrupt_keys: &mut Vec<String>,
    ) -> Result<NamespaceTidyStats> {
        let mut stats = NamespaceTidyStats::default();

        for name in self.backend.list(prefix).await? {
            if name.ends_with('/') {
                continue;
            }
            stats.scanned += 1;
            let key = format!("{}{}", prefix, name);

            let Some(bytes) = self.backend.get(&key).await? else {
                continue;
            };

            let record: CertificateRecord = match decode_json(&key, &bytes) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping undecodable certificate record");
                    corrupt_keys.push(key);
                    stats.retained += 1;
                    continue;
                }
            };

            if is_past_safety_buffer(record.valid_before, now, request.safety_buffer) {
                if self.backend.delete(&key).await? {
                    stats.deleted += 1;
                    debug!(key = %key, valid_before = %record.valid_before, "tidied expired certificate record");
                }
            } else {
                stats.retained += 1;
            }
        }

        Ok(stats)
    }
}
