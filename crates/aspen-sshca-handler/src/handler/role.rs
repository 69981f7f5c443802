//! Role handler functions.

use aspen_sshca::SshRole;
use tracing::debug;
use tracing::warn;

use super::SshCaService;
use super::sanitize_sshca_error;
use crate::fields::parse_role_request;
use crate::protocol::FieldMap;
use crate::protocol::SshCaRequest;
use crate::protocol::SshCaResponse;
use crate::protocol::SshCaRoleDeleteResultResponse;
use crate::protocol::SshCaRoleListResultResponse;
use crate::protocol::SshCaRoleResultResponse;

/// Sub-handler for role CRUD.
pub(crate) struct RoleHandler;

impl RoleHandler {
    pub(crate) fn can_handle(&self, request: &SshCaRequest) -> bool {
        matches!(
            request,
            SshCaRequest::WriteRole { .. }
                | SshCaRequest::ReadRole { .. }
                | SshCaRequest::ListRoles
                | SshCaRequest::DeleteRole { .. }
        )
    }

    pub(crate) async fn handle(&self, request: SshCaRequest, service: &SshCaService) -> anyhow::Result<SshCaResponse> {
        match request {
            SshCaRequest::WriteRole { name, fields } => handle_write_role(service, &name, &fields).await,
            SshCaRequest::ReadRole { name } => handle_read_role(service, &name).await,
            SshCaRequest::ListRoles => handle_list_roles(service).await,
            SshCaRequest::DeleteRole { name } => handle_delete_role(service, &name).await,
            _ => Err(anyhow::anyhow!("request not handled by RoleHandler")),
        }
    }
}

fn role_response(result: aspen_sshca::Result<SshRole>, name: &str, action: &str) -> SshCaResponse {
    match result {
        Ok(role) => SshCaResponse::RoleResult(SshCaRoleResultResponse {
            is_success: true,
            role: Some(role),
            error: None,
        }),
        Err(e) => {
            warn!(role = %name, error = %e, "SSH CA role {} failed", action);
            SshCaResponse::RoleResult(SshCaRoleResultResponse {
                is_success: false,
                role: None,
                error: Some(sanitize_sshca_error(&e)),
            })
        }
    }
}

async fn handle_write_role(service: &SshCaService, name: &str, fields: &FieldMap) -> anyhow::Result<SshCaResponse> {
    debug!(role = %name, "SSH CA write role request");

    let result = match parse_role_request(name, fields) {
        Ok(request) => service.store().write_role(request).await,
        Err(e) => Err(e),
    };
    Ok(role_response(result, name, "write"))
}

async fn handle_read_role(service: &SshCaService, name: &str) -> anyhow::Result<SshCaResponse> {
    debug!(role = %name, "SSH CA read role request");
    Ok(role_response(service.store().read_role(name).await, name, "read"))
}

async fn handle_list_roles(service: &SshCaService) -> anyhow::Result<SshCaResponse> {
    debug!("SSH CA list roles request");

    match service.store().list_roles().await {
        Ok(roles) => Ok(SshCaResponse::RoleListResult(SshCaRoleListResultResponse {
            is_success: true,
            roles,
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "SSH CA list roles failed");
            Ok(SshCaResponse::RoleListResult(SshCaRoleListResultResponse {
                is_success: false,
                roles: vec![],
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}

async fn handle_delete_role(service: &SshCaService, name: &str) -> anyhow::Result<SshCaResponse> {
    debug!(role = %name, "SSH CA delete role request");

    match service.store().delete_role(name).await {
        Ok(existed) => Ok(SshCaResponse::RoleDeleteResult(SshCaRoleDeleteResultResponse {
            is_success: true,
            existed,
            error: None,
        })),
        Err(e) => {
            warn!(role = %name, error = %e, "SSH CA delete role failed");
            Ok(SshCaResponse::RoleDeleteResult(SshCaRoleDeleteResultResponse {
                is_success: false,
                existed: false,
                error: Some(sanitize_sshca_error(&e)),
            }))
        }
    }
}
