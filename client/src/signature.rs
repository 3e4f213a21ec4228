//! Personal-message signatures (EIP-191) over secp256k1.
//!
//! The login challenge is signed by the wallet and the signer is recovered
//! from the signature alone, so no public key ever has to be exchanged.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;
use crate::types::Address;

/// Keccak-256 digest
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hash of `"\x19Ethereum Signed Message:\n" + len + message`
#[must_use]
pub fn hash_personal_message(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Account address controlled by `key`
#[must_use]
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

/// 65-byte `r || s || v` signature as produced by wallets
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 65]);

impl Signature {
    /// Wrap raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    fn recovery_id(&self) -> Result<RecoveryId, SessionError> {
        let v = match self.0[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            other => {
                return Err(SessionError::InvalidSignature(format!(
                    "unsupported recovery byte {other}"
                )));
            },
        };
        RecoveryId::from_byte(v)
            .ok_or_else(|| SessionError::InvalidSignature(format!("bad recovery id {v}")))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let mut bytes = [0u8; 65];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| SessionError::InvalidSignature(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sign `message` as a personal message
///
/// # Errors
///
/// Returns [`SessionError::InvalidSignature`] if the signer rejects the
/// digest (not reachable for a valid key).
pub fn sign_personal_message(key: &SigningKey, message: &str) -> Result<Signature, SessionError> {
    let digest = hash_personal_message(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| SessionError::InvalidSignature(e.to_string()))?;

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&signature.to_bytes());
    bytes[64] = 27 + recovery_id.to_byte();
    Ok(Signature(bytes))
}

/// Recover the address that signed `message`
///
/// # Errors
///
/// Returns [`SessionError::InvalidSignature`] if the signature is malformed
/// or no public key can be recovered from it.
pub fn recover_address(message: &str, signature: &Signature) -> Result<Address, SessionError> {
    let digest = hash_personal_message(message);
    let ecdsa = EcdsaSignature::from_slice(&signature.0[..64])
        .map_err(|e| SessionError::InvalidSignature(e.to_string()))?;
    let recovery_id = signature.recovery_id()?;

    let key = VerifyingKey::recover_from_prehash(&digest, &ecdsa, recovery_id)
        .map_err(|e| SessionError::InvalidSignature(e.to_string()))?;
    Ok(address_of(&key))
}

/// Check that `claimed` signed `message`
///
/// # Errors
///
/// - [`SessionError::InvalidSignature`] if nothing can be recovered
/// - [`SessionError::SignatureMismatch`] if a different account signed
pub fn verify_message(
    message: &str,
    signature: &Signature,
    claimed: Address,
) -> Result<(), SessionError> {
    let signer = recover_address(message, signature)?;
    if signer == claimed {
        Ok(())
    } else {
        tracing::warn!(%signer, %claimed, "Signature recovered a different signer");
        Err(SessionError::SignatureMismatch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn key() -> SigningKey {
        SigningKey::from_slice(&hex::decode(KEY).unwrap()).unwrap()
    }

    #[test]
    fn personal_message_hash_known_vector() {
        assert_eq!(
            hex::encode(hash_personal_message("Some data")),
            "1da44b586eb0729ff70a73c326926f6ed5a25f5b056e7f47fbc6e58d86871655"
        );
    }

    #[test]
    fn address_of_known_key() {
        let address = address_of(key().verifying_key());
        assert_eq!(address.to_checksum(), "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
    }

    #[test]
    fn recovers_known_wallet_signature() {
        let signature: Signature = "0xb91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c"
            .parse()
            .unwrap();
        let signer = recover_address("Some data", &signature).unwrap();
        assert_eq!(signer, address_of(key().verifying_key()));
    }

    #[test]
    fn sign_then_verify() {
        let key = key();
        let message = "Login to dApp - 4242";
        let signature = sign_personal_message(&key, message).unwrap();
        let claimed = address_of(key.verifying_key());

        assert!(verify_message(message, &signature, claimed).is_ok());
        assert_eq!(
            verify_message("Login to dApp - 4243", &signature, claimed),
            Err(SessionError::SignatureMismatch)
        );
    }

    #[test]
    fn rejects_bad_recovery_byte() {
        let mut bytes = *sign_personal_message(&key(), "hi").unwrap().as_bytes();
        bytes[64] = 5;
        let result = recover_address("hi", &Signature::from_bytes(bytes));
        assert!(matches!(result, Err(SessionError::InvalidSignature(_))));
    }
}
