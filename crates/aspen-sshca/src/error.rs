//! Error types for the SSH CA secrets engine.

use snafu::Snafu;

/// Result alias used throughout the engine.
pub type Result<T, E = SshCaError> = std::result::Result<T, E>;

/// Coarse classification of an [`SshCaError`].
///
/// The hosting runtime maps these onto its own response codes: validation
/// errors go back to the caller verbatim, not-found is distinct from
/// validation, and storage/decode failures surface as internal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or disallowed request fields.
    Validation,
    /// Unknown role, serial, or unconfigured CA.
    NotFound,
    /// Underlying storage read/write/list/delete failure.
    Storage,
    /// A stored record could not be decoded.
    Decode,
    /// Anything else (signing failures, serialization, exhausted retries).
    Internal,
}

/// Errors produced by the SSH CA engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SshCaError {
    // ========================================================================
    // Validation
    // ========================================================================
    /// Role name is empty, too long, or contains invalid characters.
    #[snafu(display("invalid role name '{name}': {reason}"))]
    InvalidRoleName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A duration field could not be parsed.
    #[snafu(display("invalid {field}: {reason}"))]
    InvalidTtl {
        /// Field name (`ttl`, `max_ttl`, `safety_buffer`).
        field: String,
        /// Parser message.
        reason: String,
    },

    /// Role max TTL is above the system maximum lease TTL.
    #[snafu(display("requested max TTL {requested_secs}s is higher than backend maximum {max_secs}s"))]
    MaxTtlExceedsSystem {
        /// Requested max TTL in seconds.
        requested_secs: u64,
        /// System maximum in seconds.
        max_secs: u64,
    },

    /// Explicit role TTL is above the resolved max TTL.
    #[snafu(display(
        "\"ttl\" value {ttl_secs}s must be less than \"max_ttl\" ({max_ttl_secs}s) and/or backend default max lease TTL value"
    ))]
    TtlExceedsMaxTtl {
        /// Requested TTL in seconds.
        ttl_secs: u64,
        /// Resolved max TTL in seconds.
        max_ttl_secs: u64,
    },

    /// Requested certificate type is disabled on the role.
    #[snafu(display("{cert_type} certificates are not allowed by role '{role}'"))]
    CertTypeNotAllowed {
        /// Role name.
        role: String,
        /// `user` or `host`.
        cert_type: String,
    },

    /// Unknown certificate type string.
    #[snafu(display("invalid certificate type '{value}': expected 'user' or 'host'"))]
    InvalidCertType {
        /// The rejected value.
        value: String,
    },

    /// A requested principal matched none of the role's allow-rules.
    #[snafu(display("principal '{principal}' not allowed by role '{role}'"))]
    PrincipalNotAllowed {
        /// Offending principal.
        principal: String,
        /// Role name.
        role: String,
    },

    /// A requested critical option is not in the role's allow-list.
    #[snafu(display("critical option '{option}' not allowed by role '{role}'"))]
    CriticalOptionNotAllowed {
        /// Offending option.
        option: String,
        /// Role name.
        role: String,
    },

    /// A requested extension is not in the role's allow-list.
    #[snafu(display("extension '{extension}' not allowed by role '{role}'"))]
    ExtensionNotAllowed {
        /// Offending extension.
        extension: String,
        /// Role name.
        role: String,
    },

    /// Too many principals requested.
    #[snafu(display("too many principals: {count} (max: {max})"))]
    TooManyPrincipals {
        /// Requested count.
        count: usize,
        /// Limit.
        max: usize,
    },

    /// Too many critical options or extensions requested.
    #[snafu(display("too many {field}: {count} (max: {max})"))]
    TooManyOptions {
        /// `critical_options` or `extensions`.
        field: String,
        /// Requested count.
        count: usize,
        /// Limit.
        max: usize,
    },

    /// Key id exceeds the length limit.
    #[snafu(display("key id length {length} exceeds maximum {max}"))]
    KeyIdTooLong {
        /// Actual length.
        length: usize,
        /// Limit.
        max: usize,
    },

    /// The public key to be signed could not be parsed.
    #[snafu(display("invalid public key: {reason}"))]
    InvalidPublicKey {
        /// Parser message.
        reason: String,
    },

    /// CA key material could not be parsed.
    #[snafu(display("invalid CA key: {reason}"))]
    InvalidCaKey {
        /// Parser message.
        reason: String,
    },

    /// The configured CA public key does not belong to the private key.
    #[snafu(display("CA public key does not match CA private key"))]
    CaKeyMismatch,

    /// A required request field is missing or empty.
    #[snafu(display("{field} must be provided"))]
    MissingField {
        /// Field name.
        field: String,
    },

    /// A loosely-typed request field has the wrong shape.
    #[snafu(display("invalid {field}: {reason}"))]
    InvalidField {
        /// Field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Tidy safety buffer is zero.
    #[snafu(display("invalid safety buffer: {reason}"))]
    InvalidSafetyBuffer {
        /// Why it was rejected.
        reason: String,
    },

    /// Engine configuration is inconsistent.
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig {
        /// Why it was rejected.
        reason: String,
    },

    /// A leased secret handed back by the runtime lacks the data needed to revoke it.
    #[snafu(display("invalid secret: {reason}"))]
    InvalidSecret {
        /// Why it was rejected.
        reason: String,
    },

    // ========================================================================
    // Not Found
    // ========================================================================
    /// Role does not exist.
    #[snafu(display("role not found: {name}"))]
    RoleNotFound {
        /// Role name.
        name: String,
    },

    /// No issued certificate with this serial.
    #[snafu(display("unknown certificate serial number '{serial}'"))]
    CertificateNotFound {
        /// Serial number.
        serial: String,
    },

    /// CA key material has not been configured.
    #[snafu(display("certificate authority not configured"))]
    CaNotConfigured,

    // ========================================================================
    // Storage / Decode / Internal
    // ========================================================================
    /// Underlying storage failure.
    #[snafu(display("storage error: {reason}"))]
    Storage {
        /// Backend message.
        reason: String,
    },

    /// A stored record could not be decoded.
    #[snafu(display("corrupted record at '{key}': {reason}"))]
    CorruptedRecord {
        /// Storage key.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// A record could not be encoded for storage.
    #[snafu(display("serialization error: {reason}"))]
    Serialization {
        /// Encoder message.
        reason: String,
    },

    /// The signing library failed to build or sign a certificate.
    #[snafu(display("certificate signing failed: {reason}"))]
    CertificateSigning {
        /// Library message.
        reason: String,
    },

    /// Could not reserve a unique serial number.
    #[snafu(display("unable to reserve a unique serial number after {attempts} attempts"))]
    SerialExhausted {
        /// Attempts made.
        attempts: u32,
    },
}

impl SshCaError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SshCaError::InvalidRoleName { .. }
            | SshCaError::InvalidTtl { .. }
            | SshCaError::MaxTtlExceedsSystem { .. }
            | SshCaError::TtlExceedsMaxTtl { .. }
            | SshCaError::CertTypeNotAllowed { .. }
            | SshCaError::InvalidCertType { .. }
            | SshCaError::PrincipalNotAllowed { .. }
            | SshCaError::CriticalOptionNotAllowed { .. }
            | SshCaError::ExtensionNotAllowed { .. }
            | SshCaError::TooManyPrincipals { .. }
            | SshCaError::TooManyOptions { .. }
            | SshCaError::KeyIdTooLong { .. }
            | SshCaError::InvalidPublicKey { .. }
            | SshCaError::InvalidCaKey { .. }
            | SshCaError::CaKeyMismatch
            | SshCaError::MissingField { .. }
            | SshCaError::InvalidField { .. }
            | SshCaError::InvalidSafetyBuffer { .. }
            | SshCaError::InvalidConfig { .. }
            | SshCaError::InvalidSecret { .. } => ErrorKind::Validation,
            SshCaError::RoleNotFound { .. } | SshCaError::CertificateNotFound { .. } | SshCaError::CaNotConfigured => {
                ErrorKind::NotFound
            }
            SshCaError::Storage { .. } => ErrorKind::Storage,
            SshCaError::CorruptedRecord { .. } => ErrorKind::Decode,
            SshCaError::Serialization { .. }
            | SshCaError::CertificateSigning { .. }
            | SshCaError::SerialExhausted { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the caller can fix this error by changing the request.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Whether this error denotes a missing role, serial, or CA.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
