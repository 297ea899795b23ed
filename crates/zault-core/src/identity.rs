//! The single cryptographic identity a Zault vault is built on: one ML-DSA-65
//! signing keypair and one ML-KEM-768 encapsulation keypair, persisted as one
//! flat file.

use crate::crypto::{self, mldsa, mlkem, DSA_PK_LEN, DSA_SK_LEN, KEM_PK_LEN, KEM_SK_LEN};
use crate::error::{Result, ZaultError};
use pqcrypto_mldsa::mldsa65::{PublicKey as DsaPublicKey, SecretKey as DsaSecretKey};
use pqcrypto_mlkem::mlkem768::{PublicKey as KemPublicKey, SecretKey as KemSecretKey};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use zeroize::Zeroize;

const IDENTITY_VERSION: u8 = 0x01;

/// On-disk size of `identity.bin`: 1 version byte + the four key lengths.
pub const IDENTITY_FILE_LEN: usize = 1 + DSA_PK_LEN + DSA_SK_LEN + KEM_PK_LEN + KEM_SK_LEN;

/// The shareable half of an identity: safe to hand to peers.
#[derive(Clone)]
pub struct PublicIdentity {
    pub dsa_pk: DsaPublicKey,
    pub kem_pk: KemPublicKey,
}

impl PublicIdentity {
    pub const ENCODED_LEN: usize = DSA_PK_LEN + KEM_PK_LEN;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(crypto::mldsa::public_key_bytes(&self.dsa_pk).as_slice());
        out.extend_from_slice(crypto::mlkem::public_key_bytes(&self.kem_pk).as_slice());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(ZaultError::BlockMalformed("public identity has the wrong length"));
        }
        let dsa_pk = mldsa::public_key_from_bytes(&bytes[..DSA_PK_LEN])?;
        let kem_pk = mlkem::public_key_from_bytes(&bytes[DSA_PK_LEN..])?;
        Ok(Self { dsa_pk, kem_pk })
    }
}

/// The full identity, including both secret keys. Only the raw secret-key
/// bytes are kept in memory, inside `SecretBytes` wrappers that zeroize on
/// drop; the `pqcrypto` secret-key types themselves (which do not implement
/// `Zeroize`) are reconstructed from those bytes for the duration of a
/// single sign/decapsulate call and dropped immediately after, so no
/// long-lived unzeroized copy of a secret key ever exists. The struct
/// cannot be cloned.
pub struct Identity {
    pub dsa_pk: DsaPublicKey,
    dsa_sk_bytes: SecretBytes,
    pub kem_pk: KemPublicKey,
    kem_sk_bytes: SecretBytes,
}

/// A zeroize-on-drop byte buffer for secret-key material kept around for
/// re-derivation (e.g. the vault master key), separate from the opaque
/// `pqcrypto` key types, which do not implement `Zeroize` themselves.
struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Identity {
    /// Draws both keypairs from the OS CSPRNG.
    pub fn generate() -> Self {
        let (dsa_pk, dsa_sk) = mldsa::generate();
        let (kem_pk, kem_sk) = mlkem::generate();
        Self::from_parts(dsa_pk, dsa_sk, kem_pk, kem_sk)
    }

    /// Deterministically derives both keypairs from a 32-byte seed. Two
    /// independent HKDF-expanded sub-seeds feed two independent
    /// `ChaCha20Rng` streams, one per keypair, so the two keygens never
    /// consume the same random tape.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let (mut dsa_rng, mut kem_rng) = crypto::seed_sub_rngs(seed)?;
        let (dsa_pk, dsa_sk) = mldsa::generate_from_rng(&mut dsa_rng)?;
        let (kem_pk, kem_sk) = mlkem::generate_from_rng(&mut kem_rng)?;
        Ok(Self::from_parts(dsa_pk, dsa_sk, kem_pk, kem_sk))
    }

    fn from_parts(
        dsa_pk: DsaPublicKey,
        dsa_sk: DsaSecretKey,
        kem_pk: KemPublicKey,
        kem_sk: KemSecretKey,
    ) -> Self {
        let dsa_sk_bytes = SecretBytes(mldsa::secret_key_bytes(&dsa_sk));
        let kem_sk_bytes = SecretBytes(mlkem::secret_key_bytes(&kem_sk));
        Self {
            dsa_pk,
            dsa_sk_bytes,
            kem_pk,
            kem_sk_bytes,
        }
    }

    /// Reconstructs the ML-DSA-65 secret key from its zeroize-on-drop byte
    /// buffer. The returned value is only ever held for the duration of one
    /// sign call.
    pub fn dsa_secret_key(&self) -> DsaSecretKey {
        mldsa::secret_key_from_bytes(&self.dsa_sk_bytes.0)
            .expect("identity's own DSA secret key bytes are always well-formed")
    }

    /// Reconstructs the ML-KEM-768 secret key from its zeroize-on-drop byte
    /// buffer. The returned value is only ever held for the duration of one
    /// decapsulate call.
    pub fn kem_secret_key(&self) -> KemSecretKey {
        mlkem::secret_key_from_bytes(&self.kem_sk_bytes.0)
            .expect("identity's own KEM secret key bytes are always well-formed")
    }

    /// Raw DSA secret-key bytes, used only to derive the vault master key.
    pub fn dsa_secret_key_bytes(&self) -> &[u8] {
        &self.dsa_sk_bytes.0
    }

    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            dsa_pk: self.dsa_pk.clone(),
            kem_pk: self.kem_pk.clone(),
        }
    }

    /// Serializes to the flat on-disk layout and writes it atomically:
    /// write-to-temp, fsync, rename, matching the store's own write
    /// discipline so identity creation can never leave a half-written file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::with_capacity(IDENTITY_FILE_LEN);
        bytes.push(IDENTITY_VERSION);
        bytes.extend_from_slice(&mldsa::public_key_bytes(&self.dsa_pk));
        bytes.extend_from_slice(&self.dsa_sk_bytes.0);
        bytes.extend_from_slice(&mlkem::public_key_bytes(&self.kem_pk));
        bytes.extend_from_slice(&self.kem_sk_bytes.0);

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        crate::security::set_secure_permissions(temp.path()).ok();
        temp.write_all(&bytes)?;
        temp.as_file_mut().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        bytes.zeroize();
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.len() != IDENTITY_FILE_LEN || bytes[0] != IDENTITY_VERSION {
            return Err(ZaultError::IdentityCorrupt);
        }
        let mut offset = 1;
        let dsa_pk_bytes = &bytes[offset..offset + DSA_PK_LEN];
        offset += DSA_PK_LEN;
        let dsa_sk_bytes = &bytes[offset..offset + DSA_SK_LEN];
        offset += DSA_SK_LEN;
        let kem_pk_bytes = &bytes[offset..offset + KEM_PK_LEN];
        offset += KEM_PK_LEN;
        let kem_sk_bytes = &bytes[offset..offset + KEM_SK_LEN];

        let dsa_pk = mldsa::public_key_from_bytes(dsa_pk_bytes)?;
        let dsa_sk = mldsa::secret_key_from_bytes(dsa_sk_bytes)?;
        let kem_pk = mlkem::public_key_from_bytes(kem_pk_bytes)?;
        let kem_sk = mlkem::secret_key_from_bytes(kem_sk_bytes)?;
        Ok(Self::from_parts(dsa_pk, dsa_sk, kem_pk, kem_sk))
    }

    /// Loads the identity at `path`, generating and saving a fresh one if
    /// none exists yet. Used by `Vault::init`.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let id = Self::generate();
            id.save(path)?;
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [0x42u8; 32];
        let a = Identity::from_seed(&seed).unwrap();
        let b = Identity::from_seed(&seed).unwrap();
        assert_eq!(a.public().to_bytes(), b.public().to_bytes());
    }

    #[test]
    fn different_seeds_diverge() {
        let a = Identity::from_seed(&[1u8; 32]).unwrap();
        let b = Identity::from_seed(&[2u8; 32]).unwrap();
        assert_ne!(a.public().to_bytes(), b.public().to_bytes());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.bin");
        let id = Identity::from_seed(&[9u8; 32]).unwrap();
        id.save(&path).unwrap();
        let loaded = Identity::load(&path).unwrap();
        assert_eq!(id.public().to_bytes(), loaded.public().to_bytes());
    }

    #[test]
    fn load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.bin");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(Identity::load(&path), Err(ZaultError::IdentityCorrupt)));
    }
}
