//! CA handler functions.
//!
//! Handles CA key configuration and the two unauthenticated reads
//! (public key and CRL), plus CRL regeneration.

use aspen_sshca::TEXT_PLAIN_CONTENT_TYPE;
use tracing::debug;
use tracing::warn;

use super::SshCaService;
use super::sanitize_sshca_error;
use crate::fields::parse_configure_request;
use crate::protocol::FieldMap;
use crate::protocol::SshCaConfigResultResponse;
use crate::protocol::SshCaCrlRebuildResultResponse;
use crate::protocol::SshCaRawResponse;
use crate::protocol::SshCaRequest;
use crate::protocol::SshCaResponse;

const STATUS_OK: u16 = 200;

/// Sub-handler for CA key and publication operations.
pub(crate) struct CaHandler;

impl CaHandler {
    pub(crate) fn can_handle(&self, request: &SshCaRequest) -> bool {
        matches!(
            request,
            SshCaRequest::ConfigureCa { .. }
                | SshCaRequest::ReadPublicKey
                | SshCaRequest::ReadCrl
                | SshCaRequest::RebuildCrl
        )
    }

    pub(crate) async fn handle(&self, request: SshCaRequest, service: &SshCaService) -> anyhow::Result<SshCaResponse> {
        match request {
            SshCaRequest::ConfigureCa { fields } => handle_configure_ca(service, &fields).await,
            SshCaRequest::ReadPublicKey => handle_read_public_key(service).await,
            SshCaRequest::ReadCrl => handle_read_crl(service).await,
            SshCaRequest::RebuildCrl => handle_rebuild_crl(service).await,
            _ => Err(anyhow::anyhow!("request not handled by CaHandler")),
        }
    }
}

async fn handle_configure_ca(service: &SshCaService, fields: &FieldMap) -> anyhow::Result<SshCaResponse> {
    debug!("SSH CA configure request");

    let result = match parse_configure_request(fields) {
        Ok(request) => service.store().configure_ca(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(SshCaResponse::ConfigResult(SshCaConfigResultResponse {
            is_success: true,
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "SSH CA configure failed");
            Ok(SshCaResponse::ConfigResult(SshCaConfigResultResponse {
                is_success: false,
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}

async fn handle_read_public_key(service: &SshCaService) -> anyhow::Result<SshCaResponse> {
    debug!("SSH CA public key request");
    raw_response(service.store().read_public_key().await, "public key")
}

async fn handle_read_crl(service: &SshCaService) -> anyhow::Result<SshCaResponse> {
    debug!("SSH CA CRL request");
    raw_response(service.store().read_crl().await, "CRL")
}

fn raw_response(result: aspen_sshca::Result<String>, what: &str) -> anyhow::Result<SshCaResponse> {
    match result {
        Ok(body) => Ok(SshCaResponse::RawResult(SshCaRawResponse {
            is_success: true,
            content_type: TEXT_PLAIN_CONTENT_TYPE.to_string(),
            status_code: STATUS_OK,
            body,
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, what = what, "SSH CA read failed");
            Ok(SshCaResponse::RawResult(SshCaRawResponse {
                is_success: false,
                content_type: TEXT_PLAIN_CONTENT_TYPE.to_string(),
                status_code: if e.is_not_found() { 404 } else { 500 },
                body: String::new(),
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}

async fn handle_rebuild_crl(service: &SshCaService) -> anyhow::Result<SshCaResponse> {
    debug!("SSH CA CRL rebuild request");

    match service.store().rebuild_crl().await {
        Ok(entries) => Ok(SshCaResponse::CrlRebuildResult(SshCaCrlRebuildResultResponse {
            is_success: true,
            entries: Some(entries),
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "SSH CA CRL rebuild failed");
            Ok(SshCaResponse::CrlRebuildResult(SshCaCrlRebuildResultResponse {
                is_success: false,
                entries: None,
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}
