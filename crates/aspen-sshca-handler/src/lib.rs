//! SSH CA request handler for Aspen.
//!
//! Exposes the [`aspen_sshca`] engine as a set of mount operations:
//! - CA key configuration, public key and CRL publication
//! - Role create, read, list and delete
//! - Certificate signing, revocation and lease revocation
//! - Tidy and CRL rebuild
//!
//! Requests carry loosely-typed fields; [`fields`] coerces them into the
//! engine's typed requests. Public key and CRL reads are the only requests
//! served without authentication.

pub mod fields;
mod handler;
pub mod protocol;

pub use handler::RequestContext;
pub use handler::SshCaHandler;
pub use handler::SshCaService;
pub use handler::sanitize_sshca_error;
pub use protocol::FieldMap;
pub use protocol::SshCaRequest;
pub use protocol::SshCaResponse;
