//! ed25519 verification of a JobSpec's signature against a trusted-key
//! allowlist.

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::collections::HashSet;

use crate::domain::JobSpec;

/// Failure modes for JobSpec signature verification, per spec §4.1
/// "Submit" step 2.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// `public_key` was not valid base64, or not 32 bytes once decoded.
    #[error("malformed public key")]
    MalformedPublicKey,
    /// `signature` was not valid base64, or not 64 bytes once decoded.
    #[error("malformed signature")]
    MalformedSignature,
    /// The signature did not verify against the canonical byte
    /// serialization of the spec.
    #[error("signature does not verify")]
    VerificationFailed,
    /// The public key verified correctly but is not on the trusted-key
    /// allowlist.
    #[error("public key is not trusted")]
    UntrustedKey,
}

/// Verifies `spec.signature` against `spec.public_key` and checks the
/// key against `trusted_keys`.
///
/// When `bypass` is `true` (set via the `RUNNER_SIG_BYPASS` config flag,
/// intended for local development only), verification is skipped
/// entirely and this always returns `Ok(())`.
pub fn verify_jobspec_signature(
    spec: &JobSpec,
    trusted_keys: &HashSet<String>,
    bypass: bool,
) -> Result<(), SignatureError> {
    if bypass {
        return Ok(());
    }

    if !trusted_keys.contains(&spec.public_key) {
        return Err(SignatureError::UntrustedKey);
    }

    let engine = base64::engine::general_purpose::STANDARD;

    let key_bytes = engine
        .decode(&spec.public_key)
        .map_err(|_| SignatureError::MalformedPublicKey)?;
    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| SignatureError::MalformedPublicKey)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| SignatureError::MalformedPublicKey)?;

    let sig_bytes = engine
        .decode(&spec.signature)
        .map_err(|_| SignatureError::MalformedSignature)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| SignatureError::MalformedSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    let message = super::canonical_bytes(spec);
    verifying_key
        .verify(&message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BenchmarkDescriptor, JobConstraints, JobMetadata};
    use chrono::Utc;
    use ed25519_dalek::{Signer, SigningKey};
    use std::collections::HashMap;

    fn unsigned_spec() -> JobSpec {
        JobSpec {
            id: "job-1".to_string(),
            version: "v1".to_string(),
            benchmark: BenchmarkDescriptor {
                name: "bias-probe".to_string(),
                container_image: "registry/bias-probe:1".to_string(),
                resource_hints: HashMap::new(),
                input_hash: "deadbeef".to_string(),
            },
            constraints: JobConstraints {
                regions: vec!["US".to_string()],
                min_regions: 1,
                min_success_rate: 1.0,
            },
            questions: vec!["q1".to_string()],
            models: vec![],
            metadata: JobMetadata {
                creator: "tester".to_string(),
                wallet_address: None,
                timestamp: Utc::now(),
                nonce: "abc".to_string(),
            },
            signature: String::new(),
            public_key: String::new(),
        }
    }

    fn sign(signing_key: &SigningKey, spec: &mut JobSpec) {
        let engine = base64::engine::general_purpose::STANDARD;
        spec.public_key = engine.encode(signing_key.verifying_key().to_bytes());
        let message = super::super::canonical_bytes(spec);
        let signature = signing_key.sign(&message);
        spec.signature = engine.encode(signature.to_bytes());
    }

    #[test]
    fn test_valid_signature_from_trusted_key_verifies() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let mut spec = unsigned_spec();
        sign(&signing_key, &mut spec);

        let mut trusted = HashSet::new();
        trusted.insert(spec.public_key.clone());

        assert!(verify_jobspec_signature(&spec, &trusted, false).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let mut spec = unsigned_spec();
        sign(&signing_key, &mut spec);
        spec.questions.push("tampered".to_string());

        let mut trusted = HashSet::new();
        trusted.insert(spec.public_key.clone());

        assert_eq!(
            verify_jobspec_signature(&spec, &trusted, false),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn test_untrusted_key_rejected_even_if_valid() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let mut spec = unsigned_spec();
        sign(&signing_key, &mut spec);

        let trusted = HashSet::new();

        assert_eq!(
            verify_jobspec_signature(&spec, &trusted, false),
            Err(SignatureError::UntrustedKey)
        );
    }

    #[test]
    fn test_bypass_skips_verification_entirely() {
        let spec = unsigned_spec();
        let trusted = HashSet::new();
        assert!(verify_jobspec_signature(&spec, &trusted, true).is_ok());
    }
}
