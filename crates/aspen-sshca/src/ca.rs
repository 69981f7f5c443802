//! CA key material.
//!
//! The CA public key is stored verbatim under `public_key` so that fetching
//! it returns exactly what the operator configured. The private key is stored
//! verbatim under `config/ca_private_key` and parsed on every signing call.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use ssh_key::PrivateKey;
use ssh_key::PublicKey;
use ssh_key::private::KeypairData;
use ssh_key::private::RsaKeypair;
use tracing::info;
use tracing::warn;

use crate::backend::SshCaBackend;
use crate::constants::CA_PRIVATE_KEY_KEY;
use crate::constants::CA_PUBLIC_KEY_KEY;
use crate::error::Result;
use crate::error::SshCaError;
use crate::types::ConfigureCaRequest;

/// Parse a public key given as an authorized-keys line or a bare base64 blob.
pub fn parse_public_key(input: &str) -> Result<PublicKey> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SshCaError::InvalidPublicKey {
            reason: "empty key".to_string(),
        });
    }

    if trimmed.split_whitespace().nth(1).is_some() {
        return PublicKey::from_openssh(trimmed).map_err(|e| SshCaError::InvalidPublicKey { reason: e.to_string() });
    }

    let blob = BASE64.decode(trimmed).map_err(|e| SshCaError::InvalidPublicKey {
        reason: format!("not an authorized key or base64 blob: {}", e),
    })?;
    PublicKey::from_bytes(&blob).map_err(|e| SshCaError::InvalidPublicKey { reason: e.to_string() })
}

/// Parse a CA private key in OpenSSH, PKCS#1 or PKCS#8 PEM form.
///
/// Encrypted OpenSSH keys are rejected.
pub fn parse_private_key(input: &str) -> Result<PrivateKey> {
    let trimmed = input.trim();
    let invalid = |reason: String| SshCaError::InvalidCaKey { reason };

    if trimmed.contains("BEGIN OPENSSH PRIVATE KEY") {
        let key = PrivateKey::from_openssh(trimmed).map_err(|e| invalid(e.to_string()))?;
        if key.is_encrypted() {
            return Err(invalid("encrypted private keys are not supported".to_string()));
        }
        return Ok(key);
    }

    let rsa_key = if trimmed.contains("BEGIN RSA PRIVATE KEY") {
        rsa::RsaPrivateKey::from_pkcs1_pem(trimmed).map_err(|e| invalid(e.to_string()))?
    } else if trimmed.contains("BEGIN PRIVATE KEY") {
        rsa::RsaPrivateKey::from_pkcs8_pem(trimmed).map_err(|e| invalid(e.to_string()))?
    } else {
        return Err(invalid("unrecognized private key format".to_string()));
    };

    let keypair = RsaKeypair::try_from(rsa_key).map_err(|e| invalid(e.to_string()))?;
    PrivateKey::new(KeypairData::from(keypair), "").map_err(|e| invalid(e.to_string()))
}

/// Stores and loads the CA keypair.
#[derive(Clone)]
pub struct CaKeyStore {
    backend: Arc<dyn SshCaBackend>,
}

impl CaKeyStore {
    /// Create a CA key store over `backend`.
    pub fn new(backend: Arc<dyn SshCaBackend>) -> Self {
        Self { backend }
    }

    /// Install CA key material, replacing any existing pair.
    ///
    /// Both keys are required and must belong to the same keypair.
    pub async fn configure(&self, request: ConfigureCaRequest) -> Result<()> {
        if request.public_key.trim().is_empty() {
            return Err(SshCaError::MissingField {
                field: "public_key".to_string(),
            });
        }
        if request.private_key.trim().is_empty() {
            return Err(SshCaError::MissingField {
                field: "private_key".to_string(),
            });
        }

        let private_key = parse_private_key(&request.private_key)?;
        let public_key =
            parse_public_key(&request.public_key).map_err(|e| SshCaError::InvalidCaKey { reason: e.to_string() })?;
        if private_key.public_key().key_data() != public_key.key_data() {
            return Err(SshCaError::CaKeyMismatch);
        }

        if self.backend.exists(CA_PUBLIC_KEY_KEY).await? {
            warn!("replacing existing SSH CA key material");
        }

        self.backend.put(CA_PRIVATE_KEY_KEY, request.private_key.as_bytes()).await?;
        self.backend.put(CA_PUBLIC_KEY_KEY, request.public_key.as_bytes()).await?;

        info!(algorithm = %public_key.algorithm(), "configured SSH CA");
        Ok(())
    }

    /// The configured CA public key, exactly as it was supplied.
    pub async fn public_key(&self) -> Result<String> {
        let bytes = self.backend.get(CA_PUBLIC_KEY_KEY).await?.ok_or(SshCaError::CaNotConfigured)?;
        String::from_utf8(bytes).map_err(|e| SshCaError::CorruptedRecord {
            key: CA_PUBLIC_KEY_KEY.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load the CA signing key.
    pub async fn signing_key(&self) -> Result<PrivateKey> {
        let bytes = self.backend.get(CA_PRIVATE_KEY_KEY).await?.ok_or(SshCaError::CaNotConfigured)?;
        let pem = String::from_utf8(bytes).map_err(|e| SshCaError::CorruptedRecord {
            key: CA_PRIVATE_KEY_KEY.to_string(),
            reason: e.to_string(),
        })?;
        parse_private_key(&pem).map_err(|e| SshCaError::CorruptedRecord {
            key: CA_PRIVATE_KEY_KEY.to_string(),
            reason: e.to_string(),
        })
    }
}
