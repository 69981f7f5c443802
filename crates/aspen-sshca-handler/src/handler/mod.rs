//! SSH CA request handler.
//!
//! Routes [`SshCaRequest`]s to sub-handlers:
//! - CA key configuration and public key / CRL publication
//! - Role management
//! - Certificate signing, revocation and lease revocation
//! - Tidy

pub(crate) mod ca;
pub(crate) mod cert;
pub(crate) mod role;
pub(crate) mod tidy;

use std::collections::HashMap;
use std::sync::Arc;

use aspen_sshca::ErrorKind;
use aspen_sshca::LeasedSecret;
use aspen_sshca::Revocable;
use aspen_sshca::RevocationInfo;
use aspen_sshca::SshCaError;
use aspen_sshca::SshCaStore;
use tracing::warn;

use crate::protocol::SshCaRequest;
use crate::protocol::SshCaResponse;

/// SSH CA service for one mount.
///
/// Holds the engine and the revocation capabilities registered for the
/// secret types it hands out.
pub struct SshCaService {
    store: Arc<dyn SshCaStore>,
    revocables: HashMap<&'static str, Arc<dyn Revocable>>,
}

impl SshCaService {
    /// Create a service over an engine, registering its lease revocation.
    pub fn new(store: Arc<dyn SshCaStore>) -> Self {
        let mut revocables: HashMap<&'static str, Arc<dyn Revocable>> = HashMap::new();
        let revocable = store.revocable();
        revocables.insert(revocable.secret_type(), revocable);
        Self { store, revocables }
    }

    /// The engine behind this mount.
    pub fn store(&self) -> &Arc<dyn SshCaStore> {
        &self.store
    }

    /// Revoke a lease through the capability registered for its secret type.
    pub async fn revoke_lease(&self, lease: &LeasedSecret) -> aspen_sshca::Result<RevocationInfo> {
        let Some(revocable) = self.revocables.get(lease.secret_type.as_str()) else {
            return Err(SshCaError::InvalidSecret {
                reason: format!("no revocation registered for secret type '{}'", lease.secret_type),
            });
        };
        revocable.revoke(lease).await
    }
}

/// Caller information attached to a request by the hosting runtime.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Whether the caller presented valid credentials.
    pub authenticated: bool,
    /// Display name of the caller's token, used as the default certificate key id.
    pub display_name: Option<String>,
}

impl RequestContext {
    /// Context for an authenticated caller.
    pub fn authenticated(display_name: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            display_name: Some(display_name.into()),
        }
    }

    /// Context for a caller without credentials.
    pub fn unauthenticated() -> Self {
        Self::default()
    }
}

/// Top-level SSH CA handler.
pub struct SshCaHandler {
    ca: ca::CaHandler,
    roles: role::RoleHandler,
    certs: cert::CertHandler,
    tidy: tidy::TidyHandler,
}

impl Default for SshCaHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SshCaHandler {
    /// Create a handler.
    pub const fn new() -> Self {
        Self {
            ca: ca::CaHandler,
            roles: role::RoleHandler,
            certs: cert::CertHandler,
            tidy: tidy::TidyHandler,
        }
    }

    /// Whether `request` may be served without authentication.
    pub fn is_unauthenticated(request: &SshCaRequest) -> bool {
        request.is_unauthenticated()
    }

    /// Handle one request.
    ///
    /// Engine failures are reported inside the response. `Err` is reserved
    /// for requests that cannot be routed or are not permitted.
    pub async fn handle(
        &self,
        request: SshCaRequest,
        ctx: &RequestContext,
        service: &SshCaService,
    ) -> anyhow::Result<SshCaResponse> {
        if !ctx.authenticated && !request.is_unauthenticated() {
            warn!(operation = request.operation(), "rejected unauthenticated SSH CA request");
            anyhow::bail!("permission denied: {} requires authentication", request.operation());
        }

        if self.ca.can_handle(&request) {
            return self.ca.handle(request, service).await;
        }
        if self.roles.can_handle(&request) {
            return self.roles.handle(request, service).await;
        }
        if self.certs.can_handle(&request) {
            return self.certs.handle(request, ctx, service).await;
        }
        if self.tidy.can_handle(&request) {
            return self.tidy.handle(request, service).await;
        }

        Err(anyhow::anyhow!("request not handled by SshCaHandler: {}", request.operation()))
    }

    /// Revoke a lease handed out by a sign request.
    pub async fn revoke_lease(&self, lease: &LeasedSecret, service: &SshCaService) -> anyhow::Result<SshCaResponse> {
        cert::handle_revoke_lease(service, lease).await
    }
}

// =============================================================================
// Error Sanitization
// =============================================================================

/// Sanitize SSH CA errors for client display.
///
/// Validation and not-found errors are the caller's to fix and are returned
/// verbatim. Storage, decode and internal failures get a generic message.
pub fn sanitize_sshca_error(error: &SshCaError) -> String {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => error.to_string(),
        ErrorKind::Storage => "SSH CA storage unavailable".to_string(),
        ErrorKind::Decode | ErrorKind::Internal => "Internal SSH CA error".to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
