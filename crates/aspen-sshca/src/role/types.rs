//! Role types.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::config::SshCaConfig;
use crate::constants::SYSTEM_DEFAULT_CAPPED_PLACEHOLDER;
use crate::constants::SYSTEM_DEFAULT_PLACEHOLDER;
use crate::error::Result;
use crate::pure::PrincipalPolicy;
use crate::pure::RoleTtls;
use crate::pure::parse_optional_duration;
use crate::types::CertType;

/// A stored signing role (`role/<name>`).
///
/// `ttl` and `max_ttl` are canonical duration strings written after
/// clamping, so `ttl <= max_ttl <= max lease TTL` holds for every role
/// created through [`PolicyStore`](super::PolicyStore).
///
/// Fields missing from a stored record take the same defaults a new role
/// gets: both certificate types allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshRole {
    /// Role name.
    pub name: String,
    /// Default certificate TTL.
    pub ttl: String,
    /// Maximum certificate TTL.
    pub max_ttl: String,
    /// Critical options a request may set. Empty allows any.
    pub allowed_critical_options: Vec<String>,
    /// Extensions a request may set. Empty allows any.
    pub allowed_extensions: Vec<String>,
    /// Critical options applied when a request sets none.
    pub default_critical_options: BTreeMap<String, String>,
    /// Extensions applied when a request sets none.
    pub default_extensions: BTreeMap<String, String>,
    /// Whether user certificates may be signed.
    pub allow_user_certificates: bool,
    /// Whether host certificates may be signed.
    pub allow_host_certificates: bool,
    /// Principals (or domains, for host certificates) a request may name. Empty allows any.
    pub allowed_valid_principals: Vec<String>,
    /// Host certificates may name an allowed domain itself.
    pub allow_bare_domains: bool,
    /// Host certificates may name subdomains of an allowed domain.
    pub allow_subdomains: bool,
}

impl Default for SshRole {
    fn default() -> Self {
        Self {
            name: String::new(),
            ttl: String::new(),
            max_ttl: String::new(),
            allowed_critical_options: Vec::new(),
            allowed_extensions: Vec::new(),
            default_critical_options: BTreeMap::new(),
            default_extensions: BTreeMap::new(),
            allow_user_certificates: true,
            allow_host_certificates: true,
            allowed_valid_principals: Vec::new(),
            allow_bare_domains: false,
            allow_subdomains: false,
        }
    }
}

impl SshRole {
    /// Whether this role may issue certificates of `cert_type`.
    pub fn allows_cert_type(&self, cert_type: CertType) -> bool {
        match cert_type {
            CertType::User => self.allow_user_certificates,
            CertType::Host => self.allow_host_certificates,
        }
    }

    /// Principal rules for [`find_disallowed_principal`](crate::pure::find_disallowed_principal).
    pub fn principal_policy(&self) -> PrincipalPolicy<'_> {
        PrincipalPolicy {
            allowed: &self.allowed_valid_principals,
            allow_bare_domains: self.allow_bare_domains,
            allow_subdomains: self.allow_subdomains,
        }
    }

    /// Parsed TTL pair.
    ///
    /// Empty fields fall back to the mount limits; no clamping is applied here.
    pub fn ttls(&self, config: &SshCaConfig) -> Result<RoleTtls> {
        let max_ttl = parse_optional_duration("max_ttl", Some(&self.max_ttl))?.unwrap_or(config.max_lease_ttl);
        let ttl = parse_optional_duration("ttl", Some(&self.ttl))?.unwrap_or_else(|| config.default_lease_ttl.min(max_ttl));
        Ok(RoleTtls { ttl, max_ttl })
    }

    /// Replace empty TTL fields with human-readable placeholders for display.
    pub fn with_display_placeholders(mut self) -> Self {
        let has_max = !self.max_ttl.is_empty();
        if !has_max {
            self.max_ttl = SYSTEM_DEFAULT_PLACEHOLDER.to_string();
        }
        if self.ttl.is_empty() {
            self.ttl = if has_max {
                SYSTEM_DEFAULT_CAPPED_PLACEHOLDER.to_string()
            } else {
                SYSTEM_DEFAULT_PLACEHOLDER.to_string()
            };
        }
        self
    }
}

/// Request to create or replace a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    /// Role name.
    pub name: String,
    /// Default certificate TTL as a duration string. Empty means the mount default.
    pub ttl: Option<String>,
    /// Maximum certificate TTL as a duration string. Empty means the mount maximum.
    pub max_ttl: Option<String>,
    /// Critical options a request may set.
    pub allowed_critical_options: Vec<String>,
    /// Extensions a request may set.
    pub allowed_extensions: Vec<String>,
    /// Default critical options; non-string values are stringified on write.
    pub default_critical_options: BTreeMap<String, serde_json::Value>,
    /// Default extensions; non-string values are stringified on write.
    pub default_extensions: BTreeMap<String, serde_json::Value>,
    /// Whether user certificates may be signed.
    pub allow_user_certificates: bool,
    /// Whether host certificates may be signed.
    pub allow_host_certificates: bool,
    /// Allowed principals or domains.
    pub allowed_valid_principals: Vec<String>,
    /// Host certificates may name an allowed domain itself.
    pub allow_bare_domains: bool,
    /// Host certificates may name subdomains of an allowed domain.
    pub allow_subdomains: bool,
}

impl Default for CreateRoleRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            ttl: None,
            max_ttl: None,
            allowed_critical_options: Vec::new(),
            allowed_extensions: Vec::new(),
            default_critical_options: BTreeMap::new(),
            default_extensions: BTreeMap::new(),
            allow_user_certificates: true,
            allow_host_certificates: true,
            allowed_valid_principals: Vec::new(),
            allow_bare_domains: false,
            allow_subdomains: false,
        }
    }
}

impl CreateRoleRequest {
    /// A role allowing both certificate types with mount-default TTLs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the default TTL.
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Set the max TTL.
    pub fn with_max_ttl(mut self, max_ttl: impl Into<String>) -> Self {
        self.max_ttl = Some(max_ttl.into());
        self
    }

    /// Set the allowed principals.
    pub fn with_allowed_principals<I, S>(mut self, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_valid_principals = principals.into_iter().map(Into::into).collect();
        self
    }

    /// Set the allowed critical options.
    pub fn with_allowed_critical_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_critical_options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set the allowed extensions.
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Add a default critical option.
    pub fn with_default_critical_option(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.default_critical_options.insert(name.into(), value.into());
        self
    }

    /// Add a default extension.
    pub fn with_default_extension(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.default_extensions.insert(name.into(), value.into());
        self
    }

    /// Enable or disable user certificates.
    pub fn with_user_certificates(mut self, allow: bool) -> Self {
        self.allow_user_certificates = allow;
        self
    }

    /// Enable or disable host certificates.
    pub fn with_host_certificates(mut self, allow: bool) -> Self {
        self.allow_host_certificates = allow;
        self
    }

    /// Enable or disable bare-domain host principals.
    pub fn with_bare_domains(mut self, allow: bool) -> Self {
        self.allow_bare_domains = allow;
        self
    }

    /// Enable or disable subdomain host principals.
    pub fn with_subdomains(mut self, allow: bool) -> Self {
        self.allow_subdomains = allow;
        self
    }
}
