//! SSH CA engine facade.
//!
//! Wires the policy store, CA key store, signing engine, revocation store and
//! tidy job over one backend, sharing a single revocation lock.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::SshCaBackend;
use crate::ca::CaKeyStore;
use crate::config::SshCaConfig;
use crate::error::Result;
use crate::revocation::RevocationStore;
use crate::role::CreateRoleRequest;
use crate::role::PolicyStore;
use crate::role::SshRole;
use crate::secret::CertificateSecret;
use crate::secret::Revocable;
use crate::signing::SigningEngine;
use crate::tidy::TidyJob;
use crate::types::ConfigureCaRequest;
use crate::types::RevocationInfo;
use crate::types::SignRequest;
use crate::types::SignResponse;
use crate::types::TidyReport;
use crate::types::TidyRequest;

/// SSH certificate authority.
///
/// Provides:
/// - CA key configuration and public key publication
/// - Role management with TTL clamping
/// - Certificate signing under role policy
/// - Idempotent revocation with CRL publication
/// - Tidy of expired certificate records
#[async_trait]
pub trait SshCaStore: Send + Sync {
    /// Install CA key material.
    async fn configure_ca(&self, request: ConfigureCaRequest) -> Result<()>;

    /// Read the CA public key as configured.
    async fn read_public_key(&self) -> Result<String>;

    /// Create or replace a role.
    async fn write_role(&self, request: CreateRoleRequest) -> Result<SshRole>;

    /// Read a role for display.
    async fn read_role(&self, name: &str) -> Result<SshRole>;

    /// List role names.
    async fn list_roles(&self) -> Result<Vec<String>>;

    /// Delete a role. Returns `true` if it existed.
    async fn delete_role(&self, name: &str) -> Result<bool>;

    /// Sign a public key under a role.
    async fn sign(&self, request: SignRequest) -> Result<SignResponse>;

    /// Revoke a certificate by serial number.
    async fn revoke(&self, serial: &str) -> Result<RevocationInfo>;

    /// Read the published CRL body.
    async fn read_crl(&self) -> Result<String>;

    /// Rebuild the CRL under the revocation lock.
    async fn rebuild_crl(&self) -> Result<usize>;

    /// Prune expired certificate records.
    async fn tidy(&self, request: TidyRequest) -> Result<TidyReport>;

    /// Revocation capability for leases handed out by [`sign`](Self::sign).
    fn revocable(&self) -> Arc<dyn Revocable>;
}

/// Default SSH CA implementation over an [`SshCaBackend`].
pub struct DefaultSshCaStore {
    policies: PolicyStore,
    ca: CaKeyStore,
    signer: SigningEngine,
    revocations: Arc<RevocationStore>,
    tidy: TidyJob,
    config: SshCaConfig,
}

impl DefaultSshCaStore {
    /// Create a store with the default mount configuration.
    pub fn new(backend: Arc<dyn SshCaBackend>) -> Self {
        Self::build(backend, SshCaConfig::default())
    }

    /// Create a store with a custom configuration.
    pub fn with_config(backend: Arc<dyn SshCaBackend>, config: SshCaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: Arc<dyn SshCaBackend>, config: SshCaConfig) -> Self {
        let revocations = Arc::new(RevocationStore::new(backend.clone()));
        Self {
            policies: PolicyStore::new(backend.clone(), config.clone()),
            ca: CaKeyStore::new(backend.clone()),
            signer: SigningEngine::new(backend.clone(), config.clone()),
            tidy: TidyJob::new(backend, revocations.clone()),
            revocations,
            config,
        }
    }

    /// Mount configuration in effect.
    pub fn config(&self) -> &SshCaConfig {
        &self.config
    }
}

#[async_trait]
impl SshCaStore for DefaultSshCaStore {
    async fn configure_ca(&self, request: ConfigureCaRequest) -> Result<()> {
        self.ca.configure(request).await
    }

    async fn read_public_key(&self) -> Result<String> {
        self.ca.public_key().await
    }

    async fn write_role(&self, request: CreateRoleRequest) -> Result<SshRole> {
        self.policies.create_or_update(request).await
    }

    async fn read_role(&self, name: &str) -> Result<SshRole> {
        self.policies.read(name).await
    }

    async fn list_roles(&self) -> Result<Vec<String>> {
        self.policies.list().await
    }

    async fn delete_role(&self, name: &str) -> Result<bool> {
        self.policies.delete(name).await
    }

    async fn sign(&self, request: SignRequest) -> Result<SignResponse> {
        self.signer.sign(&request).await
    }

    async fn revoke(&self, serial: &str) -> Result<RevocationInfo> {
        self.revocations.revoke(serial).await
    }

    async fn read_crl(&self) -> Result<String> {
        self.revocations.crl().await
    }

    async fn rebuild_crl(&self) -> Result<usize> {
        self.revocations.rebuild_crl().await
    }

    async fn tidy(&self, request: TidyRequest) -> Result<TidyReport> {
        self.tidy.run(&request).await
    }

    fn revocable(&self) -> Arc<dyn Revocable> {
        Arc::new(CertificateSecret::new(self.revocations.clone()))
    }
}
