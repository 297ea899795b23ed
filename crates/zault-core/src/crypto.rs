//! Thin wrappers around the post-quantum and symmetric primitives Zault is
//! built on. Every other module reaches the outside crypto ecosystem only
//! through here, so the algorithm choice can move without touching callers.

use crate::error::{Result, ZaultError};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use sha3::{Digest, Sha3_256};

pub const DSA_PK_LEN: usize = 1952;
pub const DSA_SK_LEN: usize = 4032;
pub const DSA_SIG_LEN: usize = 3309;
pub const KEM_PK_LEN: usize = 1184;
pub const KEM_SK_LEN: usize = 2400;
pub const KEM_CT_LEN: usize = 1088;
pub const SHARED_SECRET_LEN: usize = 32;

/// ML-DSA-65 (FIPS 204) signing and verification.
pub mod mldsa {
    use super::*;
    use pqcrypto_mldsa::mldsa65::{
        detached_sign, keypair, verify_detached_signature, DetachedSignature, PublicKey,
        SecretKey,
    };
    use pqcrypto_traits::sign::{
        DetachedSignature as _, PublicKey as _, SecretKey as _,
    };

    pub fn generate() -> (PublicKey, SecretKey) {
        keypair()
    }

    /// Deterministic keygen from a 32-byte seed. `fips204` is the only crate
    /// in this ecosystem exposing a seeded entry point; the resulting raw
    /// bytes are re-imported as `pqcrypto_mldsa` types so sign/verify stay on
    /// one implementation.
    pub fn generate_from_rng(rng: &mut ChaCha20Rng) -> Result<(PublicKey, SecretKey)> {
        use fips204::traits::SerDes;
        let (fips_pk, fips_sk) = fips204::ml_dsa_65::try_keygen_with_rng(rng)
            .map_err(|_| ZaultError::BlockMalformed("deterministic ML-DSA-65 keygen failed"))?;
        let pk = PublicKey::from_bytes(&fips_pk.into_bytes())
            .map_err(|_| ZaultError::BlockMalformed("ML-DSA-65 public key re-import failed"))?;
        let sk = SecretKey::from_bytes(&fips_sk.into_bytes())
            .map_err(|_| ZaultError::BlockMalformed("ML-DSA-65 secret key re-import failed"))?;
        Ok((pk, sk))
    }

    pub fn sign(sk: &SecretKey, msg: &[u8]) -> Vec<u8> {
        detached_sign(msg, sk).as_bytes().to_vec()
    }

    pub fn verify(pk: &PublicKey, msg: &[u8], sig: &[u8]) -> bool {
        let Ok(sig) = DetachedSignature::from_bytes(sig) else {
            return false;
        };
        verify_detached_signature(&sig, msg, pk).is_ok()
    }

    pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        PublicKey::from_bytes(bytes).map_err(|_| ZaultError::IdentityCorrupt)
    }

    pub fn secret_key_from_bytes(bytes: &[u8]) -> Result<SecretKey> {
        SecretKey::from_bytes(bytes).map_err(|_| ZaultError::IdentityCorrupt)
    }

    pub fn public_key_bytes(pk: &PublicKey) -> Vec<u8> {
        pk.as_bytes().to_vec()
    }

    pub fn secret_key_bytes(sk: &SecretKey) -> Vec<u8> {
        sk.as_bytes().to_vec()
    }
}

/// ML-KEM-768 (FIPS 203) key encapsulation.
pub mod mlkem {
    use super::*;
    use pqcrypto_mlkem::mlkem768::{decapsulate, encapsulate, keypair, Ciphertext, PublicKey, SecretKey};
    use pqcrypto_traits::kem::{
        Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
    };

    pub fn generate() -> (PublicKey, SecretKey) {
        keypair()
    }

    pub fn generate_from_rng(rng: &mut ChaCha20Rng) -> Result<(PublicKey, SecretKey)> {
        use fips203::traits::{KeyGen, SerDes};
        let (ek, dk) = fips203::ml_kem_768::KG::try_keygen_with_rng(rng)
            .map_err(|_| ZaultError::BlockMalformed("deterministic ML-KEM-768 keygen failed"))?;
        let pk = PublicKey::from_bytes(&ek.into_bytes())
            .map_err(|_| ZaultError::BlockMalformed("ML-KEM-768 public key re-import failed"))?;
        let sk = SecretKey::from_bytes(&dk.into_bytes())
            .map_err(|_| ZaultError::BlockMalformed("ML-KEM-768 secret key re-import failed"))?;
        Ok((pk, sk))
    }

    pub fn encapsulate_to(pk: &PublicKey) -> ([u8; SHARED_SECRET_LEN], Vec<u8>) {
        let (ss, ct) = encapsulate(pk);
        let mut out = [0u8; SHARED_SECRET_LEN];
        out.copy_from_slice(ss.as_bytes());
        (out, ct.as_bytes().to_vec())
    }

    pub fn decapsulate_from(sk: &SecretKey, ct: &[u8]) -> Result<[u8; SHARED_SECRET_LEN]> {
        let ct = Ciphertext::from_bytes(ct).map_err(|_| ZaultError::BlockMalformed("bad KEM ciphertext"))?;
        let ss = decapsulate(&ct, sk);
        let mut out = [0u8; SHARED_SECRET_LEN];
        out.copy_from_slice(ss.as_bytes());
        Ok(out)
    }

    pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        PublicKey::from_bytes(bytes).map_err(|_| ZaultError::IdentityCorrupt)
    }

    pub fn secret_key_from_bytes(bytes: &[u8]) -> Result<SecretKey> {
        SecretKey::from_bytes(bytes).map_err(|_| ZaultError::IdentityCorrupt)
    }

    pub fn public_key_bytes(pk: &PublicKey) -> Vec<u8> {
        pk.as_bytes().to_vec()
    }

    pub fn secret_key_bytes(sk: &SecretKey) -> Vec<u8> {
        sk.as_bytes().to_vec()
    }
}

/// Seeds two independent ChaCha20 sub-PRNGs for `Identity::from_seed`, one
/// per keypair, so adding a third derived key later does not perturb the
/// first two.
pub fn seed_sub_rngs(seed: &[u8; 32]) -> Result<(ChaCha20Rng, ChaCha20Rng)> {
    let hk = Hkdf::<Sha3_256>::new(Some(b"zault-id"), seed);
    let mut dsa_seed = [0u8; 32];
    hk.expand(b"zault-id-dsa-v1", &mut dsa_seed)
        .map_err(|_| ZaultError::BlockMalformed("HKDF expand failed for DSA seed"))?;
    let mut kem_seed = [0u8; 32];
    hk.expand(b"zault-id-kem-v1", &mut kem_seed)
        .map_err(|_| ZaultError::BlockMalformed("HKDF expand failed for KEM seed"))?;
    Ok((
        ChaCha20Rng::from_seed(dsa_seed),
        ChaCha20Rng::from_seed(kem_seed),
    ))
}

/// Derives the vault master key from the identity's DSA secret key bytes.
pub fn derive_vault_master_key(dsa_sk_bytes: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha3_256>::new(Some(b"zault-vault-master-key-v1"), dsa_sk_bytes);
    let mut okm = [0u8; 32];
    hk.expand(b"vault-metadata-encryption", &mut okm)
        .expect("32 is a valid SHA3-256 HKDF output length");
    okm
}

pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn random_bytes<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

pub fn random_nonce<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut nonce);
    nonce
}

pub fn random_key<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 32] {
    let mut key = [0u8; 32];
    rng.fill_bytes(&mut key);
    key
}

/// ChaCha20-Poly1305 seal with the empty associated data Zault's block
/// format specifies.
pub fn aead_seal(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|_| ZaultError::AeadAuth)
}

pub fn aead_open(key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: b"",
            },
        )
        .map_err(|_| ZaultError::AeadAuth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aead_round_trip() {
        let key = [7u8; 32];
        let nonce = [9u8; 12];
        let pt = b"hello vault";
        let ct = aead_seal(&key, &nonce, pt).unwrap();
        assert_eq!(aead_open(&key, &nonce, &ct).unwrap(), pt);
    }

    #[test]
    fn aead_tamper_fails() {
        let key = [1u8; 32];
        let nonce = [2u8; 12];
        let mut ct = aead_seal(&key, &nonce, b"data").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(aead_open(&key, &nonce, &ct).is_err());
    }

    #[test]
    fn seeded_sub_rngs_are_deterministic() {
        let seed = [0x42u8; 32];
        let (mut a1, mut b1) = seed_sub_rngs(&seed).unwrap();
        let (mut a2, mut b2) = seed_sub_rngs(&seed).unwrap();
        assert_eq!(random_bytes(&mut a1, 32), random_bytes(&mut a2, 32));
        assert_eq!(random_bytes(&mut b1, 32), random_bytes(&mut b2, 32));
    }

    #[test]
    fn vault_master_key_is_deterministic() {
        let sk = vec![5u8; DSA_SK_LEN];
        assert_eq!(derive_vault_master_key(&sk), derive_vault_master_key(&sk));
    }
}
