//! SSH certificate authority secrets engine for Aspen.
//!
//! Signs short-lived SSH user and host certificates under per-role policy,
//! tracks every issued certificate, supports revocation with a published
//! CRL, and garbage-collects expired records.
//!
//! ## Components
//!
//! - **PolicyStore** ([`role`]): role CRUD with TTL clamping
//! - **Principal validation** ([`pure::principals`]): exact, bare-domain and
//!   subdomain matching
//! - **SigningEngine** ([`signing`]): request validation, serial assignment,
//!   certificate construction and persistence
//! - **RevocationStore** ([`revocation`]): idempotent revocation, owner of the
//!   revocation lock
//! - **CrlBuilder** ([`crl`]): all-or-nothing CRL regeneration
//! - **TidyJob** ([`tidy`]): expiry-based pruning with a safety buffer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aspen_sshca::{DefaultSshCaStore, InMemorySshCaBackend, SshCaStore};
//! use aspen_sshca::{ConfigureCaRequest, CreateRoleRequest, SignRequest};
//! use std::sync::Arc;
//!
//! let store = DefaultSshCaStore::new(Arc::new(InMemorySshCaBackend::new()));
//! store.configure_ca(ConfigureCaRequest { public_key, private_key }).await?;
//! store.write_role(CreateRoleRequest::new("dev").with_allowed_principals(["alice"])).await?;
//!
//! let signed = store
//!     .sign(SignRequest::new("dev", user_key).with_principals(["alice"]))
//!     .await?;
//! store.revoke(&signed.serial_number).await?;
//! let crl = store.read_crl().await?;
//! ```

pub mod backend;
pub mod ca;
pub mod config;
pub mod constants;
pub mod crl;
pub mod error;
pub mod pure;
pub mod records;
pub mod revocation;
pub mod role;
pub mod secret;
pub mod signing;
pub mod store;
pub mod tidy;
pub mod types;

// Re-export backend types
pub use backend::InMemorySshCaBackend;
pub use backend::SshCaBackend;
pub use ca::CaKeyStore;
pub use config::SshCaConfig;
pub use constants::*;
pub use crl::CrlBuilder;
pub use error::ErrorKind;
pub use error::Result;
pub use error::SshCaError;
pub use records::CertificateRecord;
pub use revocation::RevocationStore;
// Re-export role types
pub use role::CreateRoleRequest;
pub use role::PolicyStore;
pub use role::SshRole;
pub use secret::CertificateSecret;
pub use secret::LeasedSecret;
pub use secret::Revocable;
pub use signing::SigningEngine;
pub use store::DefaultSshCaStore;
pub use store::SshCaStore;
pub use tidy::TidyJob;
// Re-export request/response types
pub use types::CertType;
pub use types::ConfigureCaRequest;
pub use types::NamespaceTidyStats;
pub use types::RevocationInfo;
pub use types::SignRequest;
pub use types::SignResponse;
pub use types::TidyReport;
pub use types::TidyRequest;
