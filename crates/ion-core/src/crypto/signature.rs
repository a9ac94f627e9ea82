use crate::codec::keccak256;
use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

/// Length of a recoverable signature `r || s || v`.
pub const SIGNATURE_LEN: usize = 65;

/// Errors during secp256k1 public key recovery.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid recovery id {0}: expected 0, 1, 27 or 28")]
    InvalidRecoveryId(u8),

    #[error("Invalid signature scalars: {0}")]
    InvalidScalars(String),

    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Recover the address that produced `signature` over the 32-byte `hash`.
///
/// Recovery alone proves nothing about authorization: callers must check the
/// returned address against the relevant validator set.
pub fn recover_signer(hash: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(signature.len()));
    }

    let recovery_id = parse_recovery_id(signature[64])?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| SignatureError::InvalidScalars(e.to_string()))?;

    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id)
        .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))?;

    Ok(public_key_to_address(&key))
}

/// Ethereum address of a public key: the last 20 bytes of the keccak256 of
/// its uncompressed encoding without the `0x04` tag.
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sign_hash, test_key};
    use hex_literal::hex;
    use k256::ecdsa::SigningKey;

    #[test]
    fn test_address_of_secret_one() {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = SigningKey::from_slice(&secret).unwrap();
        assert_eq!(
            public_key_to_address(key.verifying_key()),
            Address::from(hex!("7e5f4552091a69125d5dfcb7b8c2659029395bdf"))
        );
    }

    #[test]
    fn test_recover_roundtrip() {
        let key = test_key(3);
        let hash = keccak256(b"seal me");
        let sig = sign_hash(&key, &hash);
        let signer = recover_signer(&hash, &sig).unwrap();
        assert_eq!(signer, public_key_to_address(key.verifying_key()));
    }

    #[test]
    fn test_accepts_legacy_v() {
        let key = test_key(4);
        let hash = keccak256(b"legacy v");
        let mut sig = sign_hash(&key, &hash);
        sig[64] += 27;
        assert_eq!(
            recover_signer(&hash, &sig).unwrap(),
            public_key_to_address(key.verifying_key())
        );
    }

    #[test]
    fn test_different_hash_recovers_different_address() {
        let key = test_key(5);
        let sig = sign_hash(&key, &keccak256(b"one"));
        let other = recover_signer(&keccak256(b"two"), &sig);
        // Either recovery fails or yields an unrelated key
        if let Ok(addr) = other {
            assert_ne!(addr, public_key_to_address(key.verifying_key()));
        }
    }

    #[test]
    fn test_rejects_wrong_length() {
        let result = recover_signer(&B256::ZERO, &[0u8; 64]);
        assert!(matches!(result, Err(SignatureError::InvalidLength(64))));
    }

    #[test]
    fn test_rejects_bad_recovery_id() {
        let key = test_key(6);
        let hash = keccak256(b"bad v");
        let mut sig = sign_hash(&key, &hash);
        sig[64] = 2;
        assert!(matches!(
            recover_signer(&hash, &sig),
            Err(SignatureError::InvalidRecoveryId(2))
        ));
    }

    #[test]
    fn test_rejects_zero_scalars() {
        let mut sig = [0u8; 65];
        sig[64] = 27;
        assert!(matches!(
            recover_signer(&B256::ZERO, &sig),
            Err(SignatureError::InvalidScalars(_))
        ));
    }
}
