//! Role persistence and TTL clamping.

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::backend::SshCaBackend;
use crate::config::SshCaConfig;
use crate::constants::MAX_OPTIONS_PER_CERT;
use crate::constants::MAX_PRINCIPALS_PER_CERT;
use crate::constants::MAX_ROLE_NAME_LENGTH;
use crate::constants::ROLE_PREFIX;
use crate::error::Result;
use crate::error::SshCaError;
use crate::pure::format_duration;
use crate::pure::parse_optional_duration;
use crate::pure::resolve_role_ttls;
use crate::pure::stringify_values;
use crate::records::load_json;
use crate::records::role_key;
use crate::records::save_json;
use crate::role::types::CreateRoleRequest;
use crate::role::types::SshRole;

/// Check a role name against `\w([\w.-]*\w)?` and the length limit.
pub fn validate_role_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| SshCaError::InvalidRoleName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.len() > MAX_ROLE_NAME_LENGTH {
        return Err(invalid(&format!("exceeds {} bytes", MAX_ROLE_NAME_LENGTH)));
    }

    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let first_ok = name.chars().next().is_some_and(is_word);
    let last_ok = name.chars().next_back().is_some_and(is_word);
    if !first_ok || !last_ok {
        return Err(invalid("must start and end with a letter, digit, or underscore"));
    }
    if let Some(bad) = name.chars().find(|&c| !(is_word(c) || c == '.' || c == '-')) {
        return Err(invalid(&format!("invalid character '{}'", bad)));
    }
    Ok(())
}

/// CRUD for signing roles.
///
/// Roles are self-contained: deleting one has no effect on certificates
/// already issued under it.
#[derive(Clone)]
pub struct PolicyStore {
    backend: Arc<dyn SshCaBackend>,
    config: SshCaConfig,
}

fn non_empty_entries(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

impl PolicyStore {
    /// Create a policy store over `backend` using the mount limits in `config`.
    pub fn new(backend: Arc<dyn SshCaBackend>, config: SshCaConfig) -> Self {
        Self { backend, config }
    }

    /// Mount limits this store clamps against.
    pub fn config(&self) -> &SshCaConfig {
        &self.config
    }

    /// Create or replace a role.
    ///
    /// List entries are trimmed and empty entries dropped, so an empty name
    /// never reaches principal or option matching.
    ///
    /// TTLs are clamped and rewritten in canonical form; default option maps
    /// are coerced to string values. Returns the role as stored.
    pub async fn create_or_update(&self, request: CreateRoleRequest) -> Result<SshRole> {
        validate_role_name(&request.name)?;

        if request.allowed_valid_principals.len() > MAX_PRINCIPALS_PER_CERT {
            return Err(SshCaError::TooManyPrincipals {
                count: request.allowed_valid_principals.len(),
                max: MAX_PRINCIPALS_PER_CERT,
            });
        }
        for (field, count) in [
            ("default_critical_options", request.default_critical_options.len()),
            ("default_extensions", request.default_extensions.len()),
        ] {
            if count > MAX_OPTIONS_PER_CERT {
                return Err(SshCaError::TooManyOptions {
                    field: field.to_string(),
                    count,
                    max: MAX_OPTIONS_PER_CERT,
                });
            }
        }

        let ttl = parse_optional_duration("ttl", request.ttl.as_deref())?;
        let max_ttl = parse_optional_duration("max_ttl", request.max_ttl.as_deref())?;
        let ttls = resolve_role_ttls(ttl, max_ttl, self.config.default_lease_ttl, self.config.max_lease_ttl)?;

        let role = SshRole {
            name: request.name,
            ttl: format_duration(ttls.ttl),
            max_ttl: format_duration(ttls.max_ttl),
            allowed_critical_options: non_empty_entries(request.allowed_critical_options),
            allowed_extensions: non_empty_entries(request.allowed_extensions),
            default_critical_options: stringify_values(request.default_critical_options),
            default_extensions: stringify_values(request.default_extensions),
            allow_user_certificates: request.allow_user_certificates,
            allow_host_certificates: request.allow_host_certificates,
            allowed_valid_principals: non_empty_entries(request.allowed_valid_principals),
            allow_bare_domains: request.allow_bare_domains,
            allow_subdomains: request.allow_subdomains,
        };

        save_json(self.backend.as_ref(), &role_key(&role.name), &role).await?;

        info!(role = %role.name, ttl = %role.ttl, max_ttl = %role.max_ttl, "wrote SSH role");
        Ok(role)
    }

    /// Load a role as stored, or `None` if absent.
    pub async fn get(&self, name: &str) -> Result<Option<SshRole>> {
        load_json(self.backend.as_ref(), &role_key(name)).await
    }

    /// Read a role for display.
    ///
    /// Empty TTL fields are presented as placeholders describing the mount
    /// default they fall back to.
    pub async fn read(&self, name: &str) -> Result<SshRole> {
        let role = self.get(name).await?.ok_or_else(|| SshCaError::RoleNotFound { name: name.to_string() })?;
        Ok(role.with_display_placeholders())
    }

    /// List role names.
    pub async fn list(&self) -> Result<Vec<String>> {
        let entries = self.backend.list(ROLE_PREFIX).await?;
        Ok(entries.into_iter().filter(|e| !e.ends_with('/')).collect())
    }

    /// Delete a role. Returns `true` if it existed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let existed = self.backend.delete(&role_key(name)).await?;
        debug!(role = %name, existed, "deleted SSH role");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::backend::InMemorySshCaBackend;
    use crate::constants::SYSTEM_DEFAULT_CAPPED_PLACEHOLDER;
    use crate::constants::SYSTEM_DEFAULT_PLACEHOLDER;

    fn make_store() -> (Arc<InMemorySshCaBackend>, PolicyStore) {
        let backend = Arc::new(InMemorySshCaBackend::new());
        let store = PolicyStore::new(backend.clone(), SshCaConfig::default());
        (backend, store)
    }

    #[test]
    fn test_validate_role_name() {
        assert!(validate_role_name("web").is_ok());
        assert!(validate_role_name("a").is_ok());
        assert!(validate_role_name("web-prod.v2_x").is_ok());
        assert!(validate_role_name("").is_err());
        assert!(validate_role_name("-web").is_err());
        assert!(validate_role_name("web.").is_err());
        assert!(validate_role_name("web/prod").is_err());
        assert!(validate_role_name(&"a".repeat(MAX_ROLE_NAME_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_create_uses_system_defaults() {
        let (_, store) = make_store();

        let role = store.create_or_update(CreateRoleRequest::new("web")).await.unwrap();
        assert_eq!(role.ttl, "24h0m0s");
        assert_eq!(role.max_ttl, "768h0m0s");
        assert!(role.allow_user_certificates);
        assert!(role.allow_host_certificates);
    }

    #[tokio::test]
    async fn test_empty_list_entries_dropped() {
        let (_, store) = make_store();

        let request = CreateRoleRequest::new("hosts")
            .with_allowed_principals(["", " example.com "])
            .with_allowed_extensions(["permit-pty", ""])
            .with_subdomains(true);
        let role = store.create_or_update(request).await.unwrap();
        assert_eq!(role.allowed_valid_principals, vec!["example.com".to_string()]);
        assert_eq!(role.allowed_extensions, vec!["permit-pty".to_string()]);

        // An all-empty list stays open.
        let role = store.create_or_update(CreateRoleRequest::new("open").with_allowed_principals([""])).await.unwrap();
        assert!(role.allowed_valid_principals.is_empty());
    }

    #[tokio::test]
    async fn test_default_ttl_capped_to_role_max() {
        let (_, store) = make_store();

        let role = store.create_or_update(CreateRoleRequest::new("short").with_max_ttl("1h")).await.unwrap();
        assert_eq!(role.ttl, "1h0m0s");
        assert_eq!(role.max_ttl, "1h0m0s");
    }

    #[tokio::test]
    async fn test_explicit_ttl_above_max_rejected() {
        let (backend, store) = make_store();

        let result = store.create_or_update(CreateRoleRequest::new("bad").with_ttl("2h").with_max_ttl("1h")).await;
        assert!(matches!(result, Err(SshCaError::TtlExceedsMaxTtl { .. })));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_max_ttl_above_system_rejected() {
        let (_, store) = make_store();

        let result = store.create_or_update(CreateRoleRequest::new("bad").with_max_ttl("10000h")).await;
        assert!(matches!(result, Err(SshCaError::MaxTtlExceedsSystem { .. })));
    }

    #[tokio::test]
    async fn test_malformed_ttl_rejected() {
        let (_, store) = make_store();

        let result = store.create_or_update(CreateRoleRequest::new("bad").with_ttl("forever")).await;
        assert!(matches!(result, Err(SshCaError::InvalidTtl { field, .. }) if field == "ttl"));
    }

    #[tokio::test]
    async fn test_default_maps_are_stringified() {
        let (_, store) = make_store();

        let role = store
            .create_or_update(
                CreateRoleRequest::new("web")
                    .with_default_critical_option("force-command", "/bin/true")
                    .with_default_extension("permit-pty", json!(true)),
            )
            .await
            .unwrap();
        assert_eq!(role.default_critical_options.get("force-command").map(String::as_str), Some("/bin/true"));
        assert_eq!(role.default_extensions.get("permit-pty").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_read_list_delete() {
        let (_, store) = make_store();

        store.create_or_update(CreateRoleRequest::new("alpha")).await.unwrap();
        store.create_or_update(CreateRoleRequest::new("beta")).await.unwrap();

        assert_eq!(store.read("alpha").await.unwrap().name, "alpha");
        assert_eq!(store.list().await.unwrap(), vec!["alpha".to_string(), "beta".to_string()]);

        assert!(store.delete("alpha").await.unwrap());
        assert!(!store.delete("alpha").await.unwrap());
        assert!(matches!(store.read("alpha").await, Err(SshCaError::RoleNotFound { .. })));
    }

    #[tokio::test]
    async fn test_read_presents_placeholders_for_empty_ttls() {
        let (backend, store) = make_store();

        let legacy = SshRole {
            name: "legacy".to_string(),
            ..Default::default()
        };
        save_json(backend.as_ref(), "role/legacy", &legacy).await.unwrap();
        let read = store.read("legacy").await.unwrap();
        assert_eq!(read.ttl, SYSTEM_DEFAULT_PLACEHOLDER);
        assert_eq!(read.max_ttl, SYSTEM_DEFAULT_PLACEHOLDER);

        let capped = SshRole {
            name: "capped".to_string(),
            max_ttl: "1h0m0s".to_string(),
            ..Default::default()
        };
        save_json(backend.as_ref(), "role/capped", &capped).await.unwrap();
        let read = store.read("capped").await.unwrap();
        assert_eq!(read.ttl, SYSTEM_DEFAULT_CAPPED_PLACEHOLDER);

        // The stored role still resolves against the mount limits.
        let ttls = store.get("capped").await.unwrap().unwrap().ttls(store.config()).unwrap();
        assert_eq!(ttls.ttl, Duration::from_secs(3600));
    }
}
