//! Request and response types for the SSH CA handler.
//!
//! Requests carry loosely-typed field maps as submitted by callers. The
//! handler coerces them into the engine's typed requests (see [`crate::fields`]).

use aspen_sshca::LeasedSecret;
use aspen_sshca::SshRole;
use aspen_sshca::TidyReport;
use serde::Deserialize;
use serde::Serialize;

/// Loosely-typed request fields.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Operations exposed by an SSH CA mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SshCaRequest {
    /// Install CA key material.
    ConfigureCa { fields: FieldMap },
    /// Fetch the CA public key. Unauthenticated.
    ReadPublicKey,
    /// Create or replace a role.
    WriteRole { name: String, fields: FieldMap },
    /// Read a role.
    ReadRole { name: String },
    /// List role names.
    ListRoles,
    /// Delete a role.
    DeleteRole { name: String },
    /// Sign a public key under a role.
    Sign { role: String, fields: FieldMap },
    /// Revoke a certificate by serial number.
    Revoke { fields: FieldMap },
    /// Fetch the CRL. Unauthenticated.
    ReadCrl,
    /// Regenerate the CRL from the revocation namespace.
    RebuildCrl,
    /// Prune expired certificate records.
    Tidy { fields: FieldMap },
}

impl SshCaRequest {
    /// Short operation name for logging.
    pub fn operation(&self) -> &'static str {
        match self {
            SshCaRequest::ConfigureCa { .. } => "configure_ca",
            SshCaRequest::ReadPublicKey => "read_public_key",
            SshCaRequest::WriteRole { .. } => "write_role",
            SshCaRequest::ReadRole { .. } => "read_role",
            SshCaRequest::ListRoles => "list_roles",
            SshCaRequest::DeleteRole { .. } => "delete_role",
            SshCaRequest::Sign { .. } => "sign",
            SshCaRequest::Revoke { .. } => "revoke",
            SshCaRequest::ReadCrl => "read_crl",
            SshCaRequest::RebuildCrl => "rebuild_crl",
            SshCaRequest::Tidy { .. } => "tidy",
        }
    }

    /// Whether the request may be served without caller authentication.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, SshCaRequest::ReadPublicKey | SshCaRequest::ReadCrl)
    }
}

/// Responses produced by the SSH CA handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SshCaResponse {
    ConfigResult(SshCaConfigResultResponse),
    RoleResult(SshCaRoleResultResponse),
    RoleListResult(SshCaRoleListResultResponse),
    RoleDeleteResult(SshCaRoleDeleteResultResponse),
    SignResult(SshCaSignResultResponse),
    RevokeResult(SshCaRevokeResultResponse),
    RawResult(SshCaRawResponse),
    CrlRebuildResult(SshCaCrlRebuildResultResponse),
    TidyResult(SshCaTidyResultResponse),
}

/// Result of installing CA key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaConfigResultResponse {
    pub is_success: bool,
    pub error: Option<String>,
}

/// A role as written or read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaRoleResultResponse {
    pub is_success: bool,
    pub role: Option<SshRole>,
    pub error: Option<String>,
}

/// Role names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaRoleListResultResponse {
    pub is_success: bool,
    pub roles: Vec<String>,
    pub error: Option<String>,
}

/// Result of deleting a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaRoleDeleteResultResponse {
    pub is_success: bool,
    /// Whether the role existed before the delete.
    pub existed: bool,
    pub error: Option<String>,
}

/// A signed certificate and its lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaSignResultResponse {
    pub is_success: bool,
    pub serial_number: Option<String>,
    /// Certificate in OpenSSH text form.
    pub signed_key: Option<String>,
    pub lease: Option<LeasedSecret>,
    pub error: Option<String>,
}

/// Revocation timestamp of a certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaRevokeResultResponse {
    pub is_success: bool,
    /// Unix seconds.
    pub revocation_time: Option<i64>,
    pub revocation_time_rfc3339: Option<String>,
    pub error: Option<String>,
}

/// Raw text body served with an explicit content type and status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaRawResponse {
    pub is_success: bool,
    pub content_type: String,
    pub status_code: u16,
    pub body: String,
    pub error: Option<String>,
}

/// Result of a CRL rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaCrlRebuildResultResponse {
    pub is_success: bool,
    /// Number of certificates on the rebuilt CRL.
    pub entries: Option<usize>,
    pub error: Option<String>,
}

/// Outcome of a tidy pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshCaTidyResultResponse {
    pub is_success: bool,
    pub report: Option<TidyReport>,
    pub error: Option<String>,
}
