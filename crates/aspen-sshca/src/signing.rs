//! Certificate signing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use chrono::DateTime;
use ssh_key::PrivateKey;
use ssh_key::PublicKey;
use ssh_key::certificate::Builder as CertBuilder;
use ssh_key::rand_core::OsRng;
use tracing::debug;
use tracing::info;

use crate::backend::SshCaBackend;
use crate::ca::CaKeyStore;
use crate::ca::parse_public_key;
use crate::config::SshCaConfig;
use crate::constants::MAX_KEY_ID_LENGTH;
use crate::constants::MAX_OPTIONS_PER_CERT;
use crate::constants::MAX_PRINCIPALS_PER_CERT;
use crate::error::Result;
use crate::error::SshCaError;
use crate::pure::ValidityWindow;
use crate::pure::compute_validity_window;
use crate::pure::effective_ttl;
use crate::pure::find_disallowed_principal;
use crate::pure::format_serial;
use crate::pure::resolve_options;
use crate::records::CertificateRecord;
use crate::records::cert_key;
use crate::records::encode_json;
use crate::role::PolicyStore;
use crate::role::SshRole;
use crate::secret::LeasedSecret;
use crate::types::SignRequest;
use crate::types::SignResponse;

/// Everything needed to build a certificate, resolved from a request and its role.
struct CertificatePlan<'a> {
    public_key: PublicKey,
    request: &'a SignRequest,
    critical_options: BTreeMap<String, String>,
    extensions: BTreeMap<String, String>,
    window: ValidityWindow,
}

/// Validates signing requests against roles and issues certificates.
pub struct SigningEngine {
    backend: Arc<dyn SshCaBackend>,
    policies: PolicyStore,
    ca: CaKeyStore,
    config: SshCaConfig,
}

impl SigningEngine {
    /// Create a signing engine over `backend`.
    pub fn new(backend: Arc<dyn SshCaBackend>, config: SshCaConfig) -> Self {
        Self {
            policies: PolicyStore::new(backend.clone(), config.clone()),
            ca: CaKeyStore::new(backend.clone()),
            backend,
            config,
        }
    }

    fn now_unix_secs() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }

    fn check_limits(request: &SignRequest) -> Result<()> {
        if request.valid_principals.len() > MAX_PRINCIPALS_PER_CERT {
            return Err(SshCaError::TooManyPrincipals {
                count: request.valid_principals.len(),
                max: MAX_PRINCIPALS_PER_CERT,
            });
        }
        for (field, count) in [
            ("critical_options", request.critical_options.len()),
            ("extensions", request.extensions.len()),
        ] {
            if count > MAX_OPTIONS_PER_CERT {
                return Err(SshCaError::TooManyOptions {
                    field: field.to_string(),
                    count,
                    max: MAX_OPTIONS_PER_CERT,
                });
            }
        }
        if let Some(key_id) = &request.key_id
            && key_id.len() > MAX_KEY_ID_LENGTH
        {
            return Err(SshCaError::KeyIdTooLong {
                length: key_id.len(),
                max: MAX_KEY_ID_LENGTH,
            });
        }
        Ok(())
    }

    /// Apply the role's cert-type and principal rules.
    fn check_policy(role: &SshRole, request: &SignRequest) -> Result<()> {
        if !role.allows_cert_type(request.cert_type) {
            return Err(SshCaError::CertTypeNotAllowed {
                role: role.name.clone(),
                cert_type: request.cert_type.to_string(),
            });
        }

        if let Some(principal) =
            find_disallowed_principal(&request.valid_principals, &role.principal_policy(), request.cert_type)
        {
            return Err(SshCaError::PrincipalNotAllowed {
                principal: principal.to_string(),
                role: role.name.clone(),
            });
        }
        Ok(())
    }

    /// Sign `request.public_key` under `request.role`.
    ///
    /// The issued-certificate record is stored before returning; the
    /// response's lease lets the hosting runtime revoke it on expiry.
    pub async fn sign(&self, request: &SignRequest) -> Result<SignResponse> {
        Self::check_limits(request)?;

        let role = self
            .policies
            .get(&request.role)
            .await?
            .ok_or_else(|| SshCaError::RoleNotFound {
                name: request.role.clone(),
            })?;
        Self::check_policy(&role, request)?;

        let critical_options = resolve_options(
            &request.critical_options,
            &role.allowed_critical_options,
            &role.default_critical_options,
        )
        .map_err(|option| SshCaError::CriticalOptionNotAllowed {
            option,
            role: role.name.clone(),
        })?;
        let extensions = resolve_options(&request.extensions, &role.allowed_extensions, &role.default_extensions)
            .map_err(|extension| SshCaError::ExtensionNotAllowed {
                extension,
                role: role.name.clone(),
            })?;

        let role_ttls = role.ttls(&self.config)?;
        let ttl = effective_ttl(request.ttl, role_ttls.ttl, role_ttls.max_ttl);

        let public_key = parse_public_key(&request.public_key)?;
        let ca_key = self.ca.signing_key().await?;

        let window = compute_validity_window(Self::now_unix_secs(), ttl, self.config.clock_skew);
        let valid_before = i64::try_from(window.valid_before)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| SshCaError::CertificateSigning {
                reason: format!("validity end {} out of range", window.valid_before),
            })?;

        let plan = CertificatePlan {
            public_key,
            request,
            critical_options,
            extensions,
            window,
        };

        for attempt in 1..=self.config.max_serial_attempts {
            let serial = rand::random::<u64>();
            if serial == 0 {
                continue;
            }
            let serial_number = format_serial(serial);

            let signed_key = Self::build_certificate(&plan, serial, &serial_number, &ca_key)?;
            let record = CertificateRecord::issued(&serial_number, &signed_key, valid_before);
            let bytes = encode_json(&record)?;

            if !self.backend.put_if_absent(&cert_key(&serial_number), &bytes).await? {
                debug!(serial = %serial_number, attempt, "serial collision, regenerating");
                continue;
            }

            info!(
                role = %role.name,
                serial = %serial_number,
                cert_type = %request.cert_type,
                ttl_secs = ttl.as_secs(),
                "signed SSH certificate"
            );

            return Ok(SignResponse {
                lease: LeasedSecret::certificate(&serial_number, ttl),
                serial_number,
                signed_key,
                valid_before,
            });
        }

        Err(SshCaError::SerialExhausted {
            attempts: self.config.max_serial_attempts,
        })
    }

    fn build_certificate(
        plan: &CertificatePlan<'_>,
        serial: u64,
        serial_number: &str,
        ca_key: &PrivateKey,
    ) -> Result<String> {
        let signing_err = |e: ssh_key::Error| SshCaError::CertificateSigning { reason: e.to_string() };

        let mut builder = CertBuilder::new_with_random_nonce(
            &mut OsRng,
            plan.public_key.key_data().clone(),
            plan.window.valid_after,
            plan.window.valid_before,
        )
        .map_err(signing_err)?;

        let key_id = plan.request.key_id.as_deref().filter(|id| !id.is_empty()).unwrap_or(serial_number);
        builder.serial(serial).map_err(signing_err)?;
        builder.key_id(key_id).map_err(signing_err)?;
        builder.cert_type(plan.request.cert_type.into()).map_err(signing_err)?;

        if plan.request.valid_principals.is_empty() {
            builder.all_principals_valid().map_err(signing_err)?;
        } else {
            for principal in &plan.request.valid_principals {
                builder.valid_principal(principal.as_str()).map_err(signing_err)?;
            }
        }
        for (name, value) in &plan.critical_options {
            builder.critical_option(name.as_str(), value.as_str()).map_err(signing_err)?;
        }
        for (name, value) in &plan.extensions {
            builder.extension(name.as_str(), value.as_str()).map_err(signing_err)?;
        }

        let certificate = builder.sign(ca_key).map_err(signing_err)?;
        certificate.to_openssh().map_err(signing_err)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use ssh_key::Algorithm;
    use ssh_key::Certificate;
    use ssh_key::HashAlg;
    use ssh_key::LineEnding;

    use super::*;
    use crate::backend::InMemorySshCaBackend;
    use crate::records::load_json;
    use crate::role::CreateRoleRequest;
    use crate::types::CertType;
    use crate::types::ConfigureCaRequest;

    struct Fixture {
        backend: Arc<InMemorySshCaBackend>,
        engine: SigningEngine,
        policies: PolicyStore,
        ca_public: PublicKey,
        subject: String,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(InMemorySshCaBackend::new());
        let config = SshCaConfig::default();

        let ca = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
        let ca_public = ca.public_key().clone();
        CaKeyStore::new(backend.clone())
            .configure(ConfigureCaRequest {
                public_key: ca_public.to_openssh().unwrap(),
                private_key: ca.to_openssh(LineEnding::LF).unwrap().to_string(),
            })
            .await
            .unwrap();

        let subject = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
        Fixture {
            engine: SigningEngine::new(backend.clone(), config.clone()),
            policies: PolicyStore::new(backend.clone(), config),
            backend,
            ca_public,
            subject: subject.public_key().to_openssh().unwrap(),
        }
    }

    fn parse(signed_key: &str) -> Certificate {
        Certificate::from_openssh(signed_key).unwrap()
    }

    #[tokio::test]
    async fn test_sign_user_certificate() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("dev").with_allowed_principals(["alice"])).await.unwrap();

        let response = f
            .engine
            .sign(&SignRequest::new("dev", &f.subject).with_key_id("alice-laptop").with_principals(["alice"]))
            .await
            .unwrap();

        assert_eq!(response.serial_number.len(), 16);
        let cert = parse(&response.signed_key);
        assert_eq!(cert.key_id(), "alice-laptop");
        assert_eq!(cert.cert_type(), ssh_key::certificate::CertType::User);
        assert_eq!(cert.valid_principals(), ["alice".to_string()]);
        assert_eq!(format_serial(cert.serial()), response.serial_number);
        assert_eq!(cert.valid_before() - cert.valid_after(), 86400 + 30);

        let fingerprint = f.ca_public.fingerprint(HashAlg::Sha256);
        cert.validate_at(cert.valid_after() + 60, [&fingerprint]).unwrap();

        let stored: CertificateRecord =
            load_json(f.backend.as_ref(), &cert_key(&response.serial_number)).await.unwrap().unwrap();
        assert_eq!(stored.certificate, response.signed_key);
        assert_eq!(stored.valid_before.timestamp() as u64, cert.valid_before());
        assert_eq!(response.lease.serial_number().unwrap(), response.serial_number);
    }

    #[tokio::test]
    async fn test_unknown_role() {
        let f = fixture().await;
        let result = f.engine.sign(&SignRequest::new("nope", &f.subject)).await;
        assert!(matches!(result, Err(SshCaError::RoleNotFound { .. })));
    }

    #[tokio::test]
    async fn test_cert_type_gated_by_role() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("users").with_host_certificates(false)).await.unwrap();

        let result = f.engine.sign(&SignRequest::new("users", &f.subject).with_cert_type(CertType::Host)).await;
        assert!(matches!(result, Err(SshCaError::CertTypeNotAllowed { .. })));
        assert!(f.backend.list("certs/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_principal_rejected() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("dev").with_allowed_principals(["alice"])).await.unwrap();

        let result = f.engine.sign(&SignRequest::new("dev", &f.subject).with_principals(["root"])).await;
        assert!(matches!(result, Err(SshCaError::PrincipalNotAllowed { principal, .. }) if principal == "root"));
    }

    #[tokio::test]
    async fn test_open_role_without_principals_is_valid_for_all() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("open")).await.unwrap();

        let response = f.engine.sign(&SignRequest::new("open", &f.subject)).await.unwrap();
        let cert = parse(&response.signed_key);
        assert!(cert.valid_principals().is_empty());
        // Key id falls back to the serial.
        assert_eq!(cert.key_id(), response.serial_number);
    }

    #[tokio::test]
    async fn test_options_defaults_and_filtering() {
        let f = fixture().await;
        f.policies
            .create_or_update(
                CreateRoleRequest::new("opts")
                    .with_allowed_critical_options(["opt"])
                    .with_default_critical_option("force-command", "/usr/bin/uptime")
                    .with_default_extension("permit-pty", ""),
            )
            .await
            .unwrap();

        let rejected = f.engine.sign(&SignRequest::new("opts", &f.subject).with_critical_option("other", "x")).await;
        assert!(matches!(rejected, Err(SshCaError::CriticalOptionNotAllowed { option, .. }) if option == "other"));

        let response = f.engine.sign(&SignRequest::new("opts", &f.subject)).await.unwrap();
        let cert = parse(&response.signed_key);
        let options: BTreeMap<String, String> =
            cert.critical_options().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(options.get("force-command").map(String::as_str), Some("/usr/bin/uptime"));
        assert!(cert.extensions().iter().any(|(k, _)| k == "permit-pty"));
    }

    #[tokio::test]
    async fn test_requested_ttl_is_capped_by_role() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("short").with_max_ttl("1h")).await.unwrap();

        let response = f
            .engine
            .sign(&SignRequest::new("short", &f.subject).with_ttl(Duration::from_secs(48 * 3600)))
            .await
            .unwrap();
        let cert = parse(&response.signed_key);
        assert_eq!(cert.valid_before() - cert.valid_after(), 3600 + 30);
        assert_eq!(response.lease.ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_invalid_public_key() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("open")).await.unwrap();

        let result = f.engine.sign(&SignRequest::new("open", "ssh-ed25519 not-a-key")).await;
        assert!(matches!(result, Err(SshCaError::InvalidPublicKey { .. })));
    }

    #[tokio::test]
    async fn test_sign_without_ca() {
        let backend = Arc::new(InMemorySshCaBackend::new());
        let config = SshCaConfig::default();
        PolicyStore::new(backend.clone(), config.clone())
            .create_or_update(CreateRoleRequest::new("open"))
            .await
            .unwrap();
        let subject = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();

        let engine = SigningEngine::new(backend, config);
        let result = engine.sign(&SignRequest::new("open", subject.public_key().to_openssh().unwrap())).await;
        assert!(matches!(result, Err(SshCaError::CaNotConfigured)));
    }

    #[tokio::test]
    async fn test_serials_are_unique() {
        let f = fixture().await;
        f.policies.create_or_update(CreateRoleRequest::new("open")).await.unwrap();

        let mut serials = HashSet::new();
        for _ in 0..10 {
            let response = f.engine.sign(&SignRequest::new("open", &f.subject)).await.unwrap();
            assert!(serials.insert(response.serial_number));
        }
        assert_eq!(f.backend.list("certs/").await.unwrap().len(), 10);
    }
}
