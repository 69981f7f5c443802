//! Signing roles.
//!
//! A role is a named policy bundle constraining what a signing request may
//! contain:
//! - Certificate TTL and max TTL (clamped against the mount limits at write time)
//! - Allowed and default critical options / extensions
//! - Which certificate types may be issued
//! - Allowed principals, optionally treated as domains for host certificates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aspen_sshca::role::{CreateRoleRequest, PolicyStore};
//! use aspen_sshca::{InMemorySshCaBackend, SshCaConfig};
//! use std::sync::Arc;
//!
//! let store = PolicyStore::new(Arc::new(InMemorySshCaBackend::new()), SshCaConfig::default());
//!
//! let role = store
//!     .create_or_update(
//!         CreateRoleRequest::new("web")
//!             .with_allowed_principals(["example.com"])
//!             .with_subdomains(true)
//!             .with_max_ttl("4h"),
//!     )
//!     .await?;
//! assert_eq!(role.max_ttl, "4h0m0s");
//! ```

mod store;
mod types;

pub use store::PolicyStore;
pub use store::validate_role_name;
pub use types::CreateRoleRequest;
pub use types::SshRole;
