//! The signed, content-addressed block: the one object every other layer of
//! a vault is built from. See the module's byte layout in the crate-level
//! design notes: version, type, timestamp, author key, nonce, prev_hash,
//! length-prefixed ciphertext, signature, in that exact order.

use crate::crypto::{self, mldsa, DSA_PK_LEN, DSA_SIG_LEN};
use crate::error::{Result, ZaultError};
use pqcrypto_mldsa::mldsa65::{PublicKey as DsaPublicKey, SecretKey as DsaSecretKey};
use rand::rngs::OsRng;
use rand_core::RngCore;

pub const HASH_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    Content = 0x01,
    Metadata = 0x02,
    ShareToken = 0x03,
}

impl BlockType {
    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x01 => Ok(BlockType::Content),
            0x02 => Ok(BlockType::Metadata),
            0x03 => Ok(BlockType::ShareToken),
            _ => Err(ZaultError::BlockMalformed("unknown block_type")),
        }
    }
}

/// A fully-formed block: signed and ready to serialize, or just
/// deserialized and awaiting `verify`.
#[derive(Debug, Clone)]
pub struct Block {
    pub version: u8,
    pub block_type: BlockType,
    pub timestamp: u64,
    pub author: Vec<u8>, // DSA public key, DSA_PK_LEN bytes
    pub nonce: [u8; NONCE_LEN],
    pub prev_hash: [u8; HASH_LEN],
    pub data: Vec<u8>,
    pub signature: Vec<u8>, // DSA_SIG_LEN bytes once signed
}

pub const FORMAT_VERSION: u8 = 0x01;

impl Block {
    /// Builds and signs a new block in one step: encrypts nothing itself
    /// (the caller already has ciphertext in `data`), computes the
    /// pre-signature bytes, signs them under `dsa_sk`, and fills in
    /// `signature`. This enforces the mandated ordering (encrypt, then
    /// populate fields, then sign, then hash) by construction.
    pub fn sign_new(
        block_type: BlockType,
        timestamp: u64,
        author_pk: &DsaPublicKey,
        nonce: [u8; NONCE_LEN],
        prev_hash: [u8; HASH_LEN],
        data: Vec<u8>,
        dsa_sk: &DsaSecretKey,
    ) -> Self {
        let mut block = Block {
            version: FORMAT_VERSION,
            block_type,
            timestamp,
            author: mldsa::public_key_bytes(author_pk),
            nonce,
            prev_hash,
            data,
            signature: Vec::new(),
        };
        let signing_bytes = block.pre_signature_bytes();
        block.signature = mldsa::sign(dsa_sk, &signing_bytes);
        block
    }

    /// Every field except `signature`, in wire order: the exact bytes a
    /// signer signs and a verifier re-derives.
    fn pre_signature_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            1 + 1 + 8 + self.author.len() + NONCE_LEN + HASH_LEN + 4 + self.data.len(),
        );
        out.push(self.version);
        out.push(self.block_type as u8);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.author);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.prev_hash);
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    pub fn verify(&self) -> Result<()> {
        let author_pk = mldsa::public_key_from_bytes(&self.author).map_err(|_| {
            ZaultError::BlockMalformed("author field is not a valid ML-DSA-65 public key")
        })?;
        let signing_bytes = self.pre_signature_bytes();
        if mldsa::verify(&author_pk, &signing_bytes, &self.signature) {
            Ok(())
        } else {
            Err(ZaultError::SignatureInvalid)
        }
    }

    /// SHA3-256 over the complete serialized form, signature included: the
    /// block's content address. Resigning the same payload yields a
    /// different hash because ML-DSA's signing is randomized.
    pub fn hash(&self) -> [u8; HASH_LEN] {
        crypto::sha3_256(&self.serialize())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.pre_signature_bytes();
        out.extend_from_slice(&self.signature);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0;
        let need = |offset: usize, n: usize, what: &'static str| -> Result<()> {
            if bytes.len() < offset + n {
                Err(ZaultError::BlockMalformed(what))
            } else {
                Ok(())
            }
        };

        need(offset, 1, "truncated before version")?;
        let version = bytes[offset];
        offset += 1;
        if version != FORMAT_VERSION {
            return Err(ZaultError::BlockMalformed("unsupported block version"));
        }

        need(offset, 1, "truncated before block_type")?;
        let block_type = BlockType::from_byte(bytes[offset])?;
        offset += 1;

        need(offset, 8, "truncated before timestamp")?;
        let timestamp = u64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        need(offset, DSA_PK_LEN, "truncated before author")?;
        let author = bytes[offset..offset + DSA_PK_LEN].to_vec();
        offset += DSA_PK_LEN;

        need(offset, NONCE_LEN, "truncated before nonce")?;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[offset..offset + NONCE_LEN]);
        offset += NONCE_LEN;

        need(offset, HASH_LEN, "truncated before prev_hash")?;
        let mut prev_hash = [0u8; HASH_LEN];
        prev_hash.copy_from_slice(&bytes[offset..offset + HASH_LEN]);
        offset += HASH_LEN;

        need(offset, 4, "truncated before data_len")?;
        let data_len = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        offset += 4;

        need(offset, data_len, "data shorter than data_len")?;
        let data = bytes[offset..offset + data_len].to_vec();
        offset += data_len;

        need(offset, DSA_SIG_LEN, "truncated before signature")?;
        let signature = bytes[offset..offset + DSA_SIG_LEN].to_vec();
        offset += DSA_SIG_LEN;

        if offset != bytes.len() {
            return Err(ZaultError::BlockMalformed("trailing bytes after signature"));
        }

        Ok(Block {
            version,
            block_type,
            timestamp,
            author,
            nonce,
            prev_hash,
            data,
            signature,
        })
    }
}

/// Encrypts `plaintext` under `key` with a freshly drawn nonce. The block
/// format's associated data is always empty.
pub fn encrypt_payload(key: &[u8; 32], plaintext: &[u8]) -> ([u8; NONCE_LEN], Vec<u8>) {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = crypto::aead_seal(key, &nonce, plaintext).expect("ChaCha20-Poly1305 seal cannot fail");
    (nonce, ciphertext)
}

pub fn decrypt_payload(key: &[u8; 32], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    crypto::aead_open(key, nonce, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mldsa;

    fn signed_block(data: Vec<u8>) -> (Block, DsaPublicKey) {
        let (pk, sk) = mldsa::generate();
        let block = Block::sign_new(
            BlockType::Content,
            0,
            &pk,
            [1u8; NONCE_LEN],
            [0u8; HASH_LEN],
            data,
            &sk,
        );
        (block, pk)
    }

    #[test]
    fn serialize_round_trips() {
        let (block, _) = signed_block(b"payload".to_vec());
        let bytes = block.serialize();
        let back = Block::deserialize(&bytes).unwrap();
        assert_eq!(back.serialize(), bytes);
    }

    #[test]
    fn verify_accepts_untampered_block() {
        let (block, _) = signed_block(b"payload".to_vec());
        block.verify().unwrap();
    }

    #[test]
    fn verify_rejects_tampered_data() {
        let (mut block, _) = signed_block(b"payload".to_vec());
        block.data[0] ^= 0xFF;
        assert!(matches!(block.verify(), Err(ZaultError::SignatureInvalid)));
    }

    #[test]
    fn verify_rejects_tampered_prev_hash() {
        let (mut block, _) = signed_block(b"payload".to_vec());
        block.prev_hash[0] ^= 0xFF;
        assert!(matches!(block.verify(), Err(ZaultError::SignatureInvalid)));
    }

    #[test]
    fn hash_changes_on_resign() {
        let (pk, sk) = mldsa::generate();
        let b1 = Block::sign_new(
            BlockType::Content,
            0,
            &pk,
            [1u8; NONCE_LEN],
            [0u8; HASH_LEN],
            b"x".to_vec(),
            &sk,
        );
        let b2 = Block::sign_new(
            BlockType::Content,
            0,
            &pk,
            [1u8; NONCE_LEN],
            [0u8; HASH_LEN],
            b"x".to_vec(),
            &sk,
        );
        assert_ne!(b1.hash(), b2.hash());
    }

    #[test]
    fn payload_tamper_fails_aead() {
        let key = [3u8; 32];
        let (nonce, mut ct) = encrypt_payload(&key, b"secret");
        let last = ct.len() - 1;
        ct[last] ^= 1;
        assert!(decrypt_payload(&key, &nonce, &ct).is_err());
    }
}
