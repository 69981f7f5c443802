//! Principal validation against a role's allow-rules.
//!
//! User certificates only ever match exactly. For host certificates the
//! allowed entries are treated as domains once the role enables either domain
//! relaxation:
//!
//! - `allow_bare_domains`: the principal may equal an allowed domain.
//! - `allow_subdomains`: the principal may be a strict subdomain of an
//!   allowed domain (suffix match on `"." + domain`).
//!
//! A host role with neither flag set is a plain name list and matches exactly.

use crate::types::CertType;

/// The slice of a role that governs principals.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalPolicy<'a> {
    /// Allowed principals/domains. Empty means any principal set is accepted.
    pub allowed: &'a [String],
    /// Permit host principals equal to an allowed domain.
    pub allow_bare_domains: bool,
    /// Permit host principals that are subdomains of an allowed domain.
    pub allow_subdomains: bool,
}

impl PrincipalPolicy<'_> {
    /// An empty allow-list accepts everything, including no principals.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    #[inline]
    fn uses_domain_rules(&self) -> bool {
        self.allow_bare_domains || self.allow_subdomains
    }
}

/// Check whether `domain` is a strict subdomain of `parent`. An empty parent has no subdomains.
#[inline]
fn is_strict_subdomain(domain: &str, parent: &str) -> bool {
    !parent.is_empty()
        && domain.len() > parent.len() + 1
        && domain.ends_with(parent)
        && domain.as_bytes()[domain.len() - parent.len() - 1] == b'.'
}

/// Check a single principal against the policy.
pub fn is_principal_allowed(principal: &str, policy: &PrincipalPolicy<'_>, cert_type: CertType) -> bool {
    if policy.is_open() {
        return true;
    }

    match cert_type {
        CertType::User => policy.allowed.iter().any(|allowed| allowed == principal),
        CertType::Host if !policy.uses_domain_rules() => policy.allowed.iter().any(|allowed| allowed == principal),
        CertType::Host => policy.allowed.iter().any(|allowed| {
            (policy.allow_bare_domains && allowed == principal)
                || (policy.allow_subdomains && is_strict_subdomain(principal, allowed))
        }),
    }
}

/// Return the first requested principal the policy rejects, if any.
pub fn find_disallowed_principal<'a>(
    requested: &'a [String],
    policy: &PrincipalPolicy<'_>,
    cert_type: CertType,
) -> Option<&'a str> {
    requested.iter().map(String::as_str).find(|p| !is_principal_allowed(p, policy, cert_type))
}
