//! Property-based tests for the SSH CA handler.
//!
//! Tests cover invariants for:
//! - Option filtering: a signed certificate carries exactly the requested
//!   extensions when every one is allowed, and signing fails otherwise
//! - Revocation idempotence: repeated revocations report the first timestamp
//!   and leave the CRL unchanged
//! - CRL completeness: the CRL lists exactly the revoked certificates
//!
//! # Tiger Style
//!
//! - Bounded generators (small extension universe, few certificates)
//! - Deterministic via InMemorySshCaBackend
//! - No network I/O

mod common;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use aspen_sshca_handler::SshCaRequest;
use common::*;
use proptest::prelude::*;
use serde_json::json;
use ssh_key::Certificate;

const EXTENSIONS: &[&str] = &[
    "permit-pty",
    "permit-port-forwarding",
    "permit-agent-forwarding",
    "permit-X11-forwarding",
    "permit-user-rc",
];

fn extension_subset() -> impl Strategy<Value = BTreeSet<&'static str>> {
    proptest::sample::subsequence(EXTENSIONS, 0..=EXTENSIONS.len()).prop_map(|v| v.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Requested extensions survive verbatim iff the role allows them all.
    #[test]
    fn test_proptest_extension_filtering(allowed in extension_subset(), requested in extension_subset()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (service, _) = service();
            configure(&service).await;

            let allowed_list = allowed.iter().copied().collect::<Vec<_>>().join(",");
            write_role(&service, "prop", json!({ "allowed_extensions": allowed_list })).await;

            let requested_map: BTreeMap<String, String> =
                requested.iter().map(|e| (e.to_string(), String::new())).collect();
            let signed = sign(&service, "prop", json!({ "public_key": PUBLIC_KEY, "extensions": requested_map })).await;

            let permitted = allowed.is_empty() || requested.is_subset(&allowed);
            prop_assert_eq!(signed.is_success, permitted);

            if permitted {
                let cert = Certificate::from_openssh(signed.signed_key.as_deref().unwrap()).unwrap();
                let issued: BTreeMap<String, String> =
                    cert.extensions().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                prop_assert_eq!(issued, requested_map);
            } else {
                prop_assert!(signed.error.unwrap().starts_with("extension '"));
            }
            Ok(())
        })?;
    }

    /// Revoking the same serial again reports the original timestamp.
    #[test]
    fn test_proptest_revoke_idempotent(repeats in 2usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (service, _) = service();
            configure(&service).await;
            write_role(&service, "prop", json!({})).await;
            let signed = sign(&service, "prop", json!({ "public_key": PUBLIC_KEY })).await;
            let serial = signed.serial_number.unwrap();

            let first = revoke(&service, &serial).await;
            prop_assert!(first.is_success);
            let crl = read_raw(&service, SshCaRequest::ReadCrl).await.body;

            for _ in 1..repeats {
                let again = revoke(&service, &serial).await;
                prop_assert!(again.is_success);
                prop_assert_eq!(again.revocation_time, first.revocation_time);
                prop_assert_eq!(&again.revocation_time_rfc3339, &first.revocation_time_rfc3339);
                prop_assert_eq!(&read_raw(&service, SshCaRequest::ReadCrl).await.body, &crl);
            }
            Ok(())
        })?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// The CRL holds exactly the certificates that were revoked.
    #[test]
    fn test_proptest_crl_completeness(revoke_mask in proptest::collection::vec(any::<bool>(), 1..6)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (service, _) = service();
            configure(&service).await;
            write_role(&service, "prop", json!({})).await;

            let mut expected = BTreeSet::new();
            for revoke_it in &revoke_mask {
                let signed = sign(&service, "prop", json!({ "public_key": PUBLIC_KEY })).await;
                prop_assert!(signed.is_success);
                if *revoke_it {
                    let serial = signed.serial_number.unwrap();
                    prop_assert!(revoke(&service, &serial).await.is_success);
                    expected.insert(signed.signed_key.unwrap());
                }
            }

            let crl = read_raw(&service, SshCaRequest::ReadCrl).await.body;
            let listed: BTreeSet<String> = crl.lines().map(str::to_string).collect();
            prop_assert_eq!(listed, expected);
            Ok(())
        })?;
    }
}
