//! Zault core: a zero-knowledge, post-quantum encrypted storage engine.
//!
//! A [`crate::identity::Identity`] holds an ML-DSA-65 signing keypair and an
//! ML-KEM-768 encapsulation keypair. A [`crate::vault::Vault`] binds an
//! identity to a content-addressed [`crate::store::BlockStore`] and exposes
//! `add_file`/`get_file`/`list`/`verify`. Everything the store holds is a
//! signed, encrypted [`crate::block::Block`]; nothing readable ever touches
//! disk.

pub mod block;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod security;
pub mod store;
pub mod vault;

pub use block::{Block, BlockType};
pub use error::{Result, ZaultError};
pub use identity::{Identity, PublicIdentity};
pub use metadata::Metadata;
pub use store::BlockStore;
pub use vault::{decrypt_message, encrypt_message, FileEntry, Vault, MAX_FILE_SIZE};
