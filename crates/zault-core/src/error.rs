//! Unified error type for the Zault core.

use thiserror::Error;

/// Errors surfaced by every Zault core operation.
#[derive(Error, Debug)]
pub enum ZaultError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("identity file is corrupt or has an unsupported version")]
    IdentityCorrupt,

    #[error("no block found for the requested hash")]
    NotFound,

    #[error("block is malformed: {0}")]
    BlockMalformed(&'static str),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("AEAD authentication failed")]
    AeadAuth,

    #[error("metadata decrypted but does not belong to this vault")]
    WrongVaultMaster,

    #[error("metadata record is malformed: {0}")]
    MetadataMalformed(&'static str),

    #[error("file exceeds the maximum size of {0} bytes")]
    FileTooLarge(u64),

    #[error("stored block at this hash has different contents (corruption)")]
    HashCollision,
}

pub type Result<T> = std::result::Result<T, ZaultError>;
