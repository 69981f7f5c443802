//! Tidy handler.

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SshCaService;
use super::sanitize_sshca_error;
use crate::fields::parse_tidy_request;
use crate::protocol::FieldMap;
use crate::protocol::SshCaRequest;
use crate::protocol::SshCaResponse;
use crate::protocol::SshCaTidyResultResponse;

/// Sub-handler for tidy.
pub(crate) struct TidyHandler;

impl TidyHandler {
    pub(crate) fn can_handle(&self, request: &SshCaRequest) -> bool {
        matches!(request, SshCaRequest::Tidy { .. })
    }

    pub(crate) async fn handle(&self, request: SshCaRequest, service: &SshCaService) -> anyhow::Result<SshCaResponse> {
        match request {
            SshCaRequest::Tidy { fields } => handle_tidy(service, &fields).await,
            _ => Err(anyhow::anyhow!("request not handled by TidyHandler")),
        }
    }
}

async fn handle_tidy(service: &SshCaService, fields: &FieldMap) -> anyhow::Result<SshCaResponse> {
    debug!("SSH CA tidy request");

    let result = match parse_tidy_request(fields) {
        Ok(request) => service.store().tidy(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            if !report.corrupt_keys.is_empty() {
                info!(corrupt = report.corrupt_keys.len(), "SSH CA tidy left undecodable records in place");
            }
            Ok(SshCaResponse::TidyResult(SshCaTidyResultResponse {
                is_success: true,
                report: Some(report),
                error: None,
            }))
        }
        Err(e) => {
            warn!(error = %e, "SSH CA tidy failed");
            Ok(SshCaResponse::TidyResult(SshCaTidyResultResponse {
                is_success: false,
                report: None,
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}
