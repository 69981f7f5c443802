//! Certificate handler functions.
//!
//! Handles signing, revocation by serial number, and lease revocation.

use aspen_sshca::LeasedSecret;
use aspen_sshca::RevocationInfo;
use tracing::debug;
use tracing::warn;

use super::RequestContext;
use super::SshCaService;
use super::sanitize_sshca_error;
use crate::fields::parse_serial_number;
use crate::fields::parse_sign_request;
use crate::protocol::FieldMap;
use crate::protocol::SshCaRequest;
use crate::protocol::SshCaResponse;
use crate::protocol::SshCaRevokeResultResponse;
use crate::protocol::SshCaSignResultResponse;

/// Sub-handler for certificate operations.
pub(crate) struct CertHandler;

impl CertHandler {
    pub(crate) fn can_handle(&self, request: &SshCaRequest) -> bool {
        matches!(request, SshCaRequest::Sign { .. } | SshCaRequest::Revoke { .. })
    }

    pub(crate) async fn handle(
        &self,
        request: SshCaRequest,
        ctx: &RequestContext,
        service: &SshCaService,
    ) -> anyhow::Result<SshCaResponse> {
        match request {
            SshCaRequest::Sign { role, fields } => handle_sign(service, ctx, &role, &fields).await,
            SshCaRequest::Revoke { fields } => handle_revoke(service, &fields).await,
            _ => Err(anyhow::anyhow!("request not handled by CertHandler")),
        }
    }
}

async fn handle_sign(
    service: &SshCaService,
    ctx: &RequestContext,
    role: &str,
    fields: &FieldMap,
) -> anyhow::Result<SshCaResponse> {
    debug!(role = %role, "SSH CA sign request");

    let result = match parse_sign_request(role, fields, ctx.display_name.as_deref()) {
        Ok(request) => service.store().sign(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(signed) => Ok(SshCaResponse::SignResult(SshCaSignResultResponse {
            is_success: true,
            serial_number: Some(signed.serial_number),
            signed_key: Some(signed.signed_key),
            lease: Some(signed.lease),
            error: None,
        })),
        Err(e) => {
            warn!(role = %role, error = %e, "SSH CA sign failed");
            Ok(SshCaResponse::SignResult(SshCaSignResultResponse {
                is_success: false,
                serial_number: None,
                signed_key: None,
                lease: None,
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}

async fn handle_revoke(service: &SshCaService, fields: &FieldMap) -> anyhow::Result<SshCaResponse> {
    let result = match parse_serial_number(fields) {
        Ok(serial) => {
            debug!(serial = %serial, "SSH CA revoke request");
            service.store().revoke(&serial).await
        }
        Err(e) => Err(e),
    };
    Ok(revoke_response(result))
}

pub(crate) async fn handle_revoke_lease(service: &SshCaService, lease: &LeasedSecret) -> anyhow::Result<SshCaResponse> {
    debug!(secret_type = %lease.secret_type, "SSH CA lease revoke request");
    Ok(revoke_response(service.revoke_lease(lease).await))
}

fn revoke_response(result: aspen_sshca::Result<RevocationInfo>) -> SshCaResponse {
    match result {
        Ok(info) => SshCaResponse::RevokeResult(SshCaRevokeResultResponse {
            is_success: true,
            revocation_time: Some(info.revocation_time),
            revocation_time_rfc3339: Some(info.revocation_time_rfc3339),
            error: None,
        }),
        Err(e) => {
            warn!(error = %e, "SSH CA revoke failed");
            SshCaResponse::RevokeResult(SshCaRevokeResultResponse {
                is_success: false,
                revocation_time: None,
                revocation_time_rfc3339: None,
                error: Some(sanitize_sshca_error(&e)),
            })
        }
    }
}
