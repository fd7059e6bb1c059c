//! Ed25519 verification of interaction webhook requests.
//!
//! Discord signs `timestamp || body` with the application key and sends the
//! signature hex-encoded in `X-Signature-Ed25519`.

use ed25519_dalek::{Signature, VerifyingKey};

use crate::error::{ChannelError, ConfigError};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Verifies request signatures against the application public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Parse the hex public key shown in the developer portal.
    pub fn from_hex(public_key: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "DISCORD_PUBLIC_KEY".to_string(),
            message,
        };
        let bytes = hex::decode(public_key.trim()).map_err(|e| invalid(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))?;
        let key = VerifyingKey::from_bytes(&arr).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn from_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Check `signature_hex` over `timestamp || body`.
    pub fn verify(
        &self,
        signature_hex: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<(), ChannelError> {
        let sig_bytes = hex::decode(signature_hex).map_err(|_| ChannelError::InvalidSignature)?;
        let sig_arr: [u8; 64] = sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| ChannelError::InvalidSignature)?;
        let signature = Signature::from_bytes(&sig_arr);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify_strict(&message, &signature)
            .map_err(|_| ChannelError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let key = signing_key();
        let verifier =
            SignatureVerifier::from_hex(&hex::encode(key.verifying_key().to_bytes())).unwrap();
        let sig = sign(&key, "1700000000", b"{\"type\":1}");
        assert!(verifier.verify(&sig, "1700000000", b"{\"type\":1}").is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let key = signing_key();
        let verifier = SignatureVerifier::from_key(key.verifying_key());
        let sig = sign(&key, "1700000000", b"{\"type\":1}");
        assert!(verifier.verify(&sig, "1700000000", b"{\"type\":2}").is_err());
        assert!(verifier.verify(&sig, "1700000001", b"{\"type\":1}").is_err());
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let verifier = SignatureVerifier::from_key(signing_key().verifying_key());
        assert!(verifier.verify("zz", "1", b"").is_err());
        assert!(verifier.verify("abcd", "1", b"").is_err());
    }

    #[test]
    fn test_bad_public_key_is_config_error() {
        let err = SignatureVerifier::from_hex("1234").unwrap_err();
        assert!(err.to_string().contains("DISCORD_PUBLIC_KEY"));
    }
}
