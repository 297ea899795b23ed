//! C ABI surface for Zault: identity management, message encryption, signing
//! and hashing, exposed for host-language bindings. Every function is
//! `#[no_mangle] extern "C"`, takes raw pointer/length pairs, and never
//! unwinds across the FFI boundary; internal panics and errors alike are
//! mapped to one of the status codes below.
//!
//! Caller-owns-the-buffer: every output buffer is allocated by the caller
//! using the size-getter constants, and this crate never retains a pointer
//! past the call that received it.

use std::panic;
use std::slice;
use zault_core::identity::{Identity, PublicIdentity};
use zault_core::{vault, ZaultError};

pub const ZAULT_OK: i32 = 0;
pub const ZAULT_INVALID_ARG: i32 = -1;
pub const ZAULT_ALLOC: i32 = -2;
pub const ZAULT_CRYPTO: i32 = -4;
pub const ZAULT_AUTH_FAILED: i32 = -8;

pub const ZAULT_DSA_PK_LEN: usize = zault_core::crypto::DSA_PK_LEN;
pub const ZAULT_DSA_SIG_LEN: usize = zault_core::crypto::DSA_SIG_LEN;
pub const ZAULT_KEM_PK_LEN: usize = zault_core::crypto::KEM_PK_LEN;
pub const ZAULT_KEM_CT_LEN: usize = zault_core::crypto::KEM_CT_LEN;
pub const ZAULT_PUBLIC_IDENTITY_LEN: usize = PublicIdentity::ENCODED_LEN;
pub const ZAULT_IDENTITY_FILE_LEN: usize = zault_core::identity::IDENTITY_FILE_LEN;
pub const ZAULT_MESSAGE_OVERHEAD: usize = ZAULT_KEM_CT_LEN + 12 + 16;
pub const ZAULT_SHA3_256_LEN: usize = 32;
pub const ZAULT_GROUP_KEY_LEN: usize = 32;

/// An opaque handle owning a full identity (both secret keys).
pub struct ZaultIdentity(Identity);

fn err_to_status(e: ZaultError) -> i32 {
    match e {
        ZaultError::AeadAuth | ZaultError::WrongVaultMaster | ZaultError::SignatureInvalid => {
            ZAULT_AUTH_FAILED
        }
        ZaultError::IdentityCorrupt
        | ZaultError::BlockMalformed(_)
        | ZaultError::MetadataMalformed(_)
        | ZaultError::HashCollision => ZAULT_CRYPTO,
        ZaultError::NotFound | ZaultError::FileTooLarge(_) => ZAULT_INVALID_ARG,
        ZaultError::Io(_) => ZAULT_CRYPTO,
    }
}

/// Runs `f`, turning any panic into `ZAULT_CRYPTO` instead of unwinding
/// across the FFI boundary.
fn guard(f: impl FnOnce() -> i32 + panic::UnwindSafe) -> i32 {
    panic::catch_unwind(f).unwrap_or(ZAULT_CRYPTO)
}

unsafe fn slice_from_raw<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() && len != 0 {
        None
    } else if len == 0 {
        Some(&[])
    } else {
        Some(slice::from_raw_parts(ptr, len))
    }
}

unsafe fn slice_from_raw_mut<'a>(ptr: *mut u8, len: usize) -> Option<&'a mut [u8]> {
    if ptr.is_null() && len != 0 {
        None
    } else if len == 0 {
        Some(&mut [])
    } else {
        Some(slice::from_raw_parts_mut(ptr, len))
    }
}

/// Generates a fresh identity from OS randomness. Returns an owned handle
/// that must be freed with [`zault_identity_free`].
#[no_mangle]
pub extern "C" fn zault_identity_generate(out_handle: *mut *mut ZaultIdentity) -> i32 {
    guard(|| {
        if out_handle.is_null() {
            return ZAULT_INVALID_ARG;
        }
        let identity = Box::new(ZaultIdentity(Identity::generate()));
        unsafe { *out_handle = Box::into_raw(identity) };
        ZAULT_OK
    })
}

/// Deterministically derives an identity from a 32-byte seed.
#[no_mangle]
pub extern "C" fn zault_identity_from_seed(
    seed_ptr: *const u8,
    seed_len: usize,
    out_handle: *mut *mut ZaultIdentity,
) -> i32 {
    guard(|| {
        if out_handle.is_null() || seed_len != 32 {
            return ZAULT_INVALID_ARG;
        }
        let Some(seed_slice) = (unsafe { slice_from_raw(seed_ptr, seed_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let mut seed = [0u8; 32];
        seed.copy_from_slice(seed_slice);
        match Identity::from_seed(&seed) {
            Ok(identity) => {
                unsafe { *out_handle = Box::into_raw(Box::new(ZaultIdentity(identity))) };
                ZAULT_OK
            }
            Err(e) => err_to_status(e),
        }
    })
}

/// Frees an identity handle created by this crate. Safe to call with null.
#[no_mangle]
pub extern "C" fn zault_identity_free(handle: *mut ZaultIdentity) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

/// Writes the 3,136-byte public identity (`dsa_pk ‖ kem_pk`) to `out`, which
/// must be at least [`ZAULT_PUBLIC_IDENTITY_LEN`] bytes.
#[no_mangle]
pub extern "C" fn zault_identity_serialize_public(
    handle: *const ZaultIdentity,
    out_ptr: *mut u8,
    out_len: usize,
) -> i32 {
    guard(|| {
        if handle.is_null() || out_len < ZAULT_PUBLIC_IDENTITY_LEN {
            return ZAULT_INVALID_ARG;
        }
        let identity = unsafe { &(*handle).0 };
        let bytes = identity.public().to_bytes();
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..bytes.len()].copy_from_slice(&bytes);
        ZAULT_OK
    })
}

/// Parses a serialized public identity and writes its two component public
/// keys out separately.
#[no_mangle]
pub extern "C" fn zault_parse_public_identity(
    in_ptr: *const u8,
    in_len: usize,
    out_dsa_pk: *mut u8,
    out_dsa_pk_len: usize,
    out_kem_pk: *mut u8,
    out_kem_pk_len: usize,
) -> i32 {
    guard(|| {
        if out_dsa_pk_len < ZAULT_DSA_PK_LEN || out_kem_pk_len < ZAULT_KEM_PK_LEN {
            return ZAULT_INVALID_ARG;
        }
        let Some(bytes) = (unsafe { slice_from_raw(in_ptr, in_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let public = match PublicIdentity::from_bytes(bytes) {
            Ok(p) => p,
            Err(e) => return err_to_status(e),
        };
        let Some(dsa_out) = (unsafe { slice_from_raw_mut(out_dsa_pk, out_dsa_pk_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let Some(kem_out) = (unsafe { slice_from_raw_mut(out_kem_pk, out_kem_pk_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let dsa_bytes = zault_core::crypto::mldsa::public_key_bytes(&public.dsa_pk);
        let kem_bytes = zault_core::crypto::mlkem::public_key_bytes(&public.kem_pk);
        dsa_out[..dsa_bytes.len()].copy_from_slice(&dsa_bytes);
        kem_out[..kem_bytes.len()].copy_from_slice(&kem_bytes);
        ZAULT_OK
    })
}

/// KEM-then-AEAD encryption to a recipient's serialized ML-KEM-768 public
/// key. Writes `plaintext_len + ZAULT_MESSAGE_OVERHEAD` bytes to `out`.
#[no_mangle]
pub extern "C" fn zault_encrypt_message(
    recipient_kem_pk_ptr: *const u8,
    recipient_kem_pk_len: usize,
    plaintext_ptr: *const u8,
    plaintext_len: usize,
    out_ptr: *mut u8,
    out_len: usize,
) -> i32 {
    guard(|| {
        if recipient_kem_pk_len != ZAULT_KEM_PK_LEN {
            return ZAULT_INVALID_ARG;
        }
        let expected_out = plaintext_len + ZAULT_MESSAGE_OVERHEAD;
        if out_len < expected_out {
            return ZAULT_INVALID_ARG;
        }
        let Some(pk_bytes) = (unsafe { slice_from_raw(recipient_kem_pk_ptr, recipient_kem_pk_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let Some(plaintext) = (unsafe { slice_from_raw(plaintext_ptr, plaintext_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let pk = match zault_core::crypto::mlkem::public_key_from_bytes(pk_bytes) {
            Ok(pk) => pk,
            Err(e) => return err_to_status(e),
        };
        let ciphertext = vault::encrypt_message(&pk, plaintext);
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..ciphertext.len()].copy_from_slice(&ciphertext);
        ZAULT_OK
    })
}

/// Decrypts a message produced by [`zault_encrypt_message`] for this
/// identity. `out_len` must be at least `ciphertext_len - ZAULT_MESSAGE_OVERHEAD`.
#[no_mangle]
pub extern "C" fn zault_decrypt_message(
    handle: *const ZaultIdentity,
    ciphertext_ptr: *const u8,
    ciphertext_len: usize,
    out_ptr: *mut u8,
    out_len: usize,
    out_written: *mut usize,
) -> i32 {
    guard(|| {
        if handle.is_null() || out_written.is_null() {
            return ZAULT_INVALID_ARG;
        }
        let identity = unsafe { &(*handle).0 };
        let Some(ciphertext) = (unsafe { slice_from_raw(ciphertext_ptr, ciphertext_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let plaintext = match vault::decrypt_message(identity, ciphertext) {
            Ok(p) => p,
            Err(e) => return err_to_status(e),
        };
        if out_len < plaintext.len() {
            return ZAULT_INVALID_ARG;
        }
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..plaintext.len()].copy_from_slice(&plaintext);
        unsafe { *out_written = plaintext.len() };
        ZAULT_OK
    })
}

/// Signs `data` with this identity's ML-DSA-65 secret key. `out` must be at
/// least [`ZAULT_DSA_SIG_LEN`] bytes.
#[no_mangle]
pub extern "C" fn zault_sign(
    handle: *const ZaultIdentity,
    data_ptr: *const u8,
    data_len: usize,
    out_ptr: *mut u8,
    out_len: usize,
) -> i32 {
    guard(|| {
        if handle.is_null() || out_len < ZAULT_DSA_SIG_LEN {
            return ZAULT_INVALID_ARG;
        }
        let identity = unsafe { &(*handle).0 };
        let Some(data) = (unsafe { slice_from_raw(data_ptr, data_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let sig = zault_core::crypto::mldsa::sign(&identity.dsa_secret_key(), data);
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..sig.len()].copy_from_slice(&sig);
        ZAULT_OK
    })
}

/// Verifies an ML-DSA-65 signature. Returns `ZAULT_OK` if valid,
/// `ZAULT_AUTH_FAILED` otherwise.
#[no_mangle]
pub extern "C" fn zault_verify(
    dsa_pk_ptr: *const u8,
    dsa_pk_len: usize,
    data_ptr: *const u8,
    data_len: usize,
    sig_ptr: *const u8,
    sig_len: usize,
) -> i32 {
    guard(|| {
        if dsa_pk_len != ZAULT_DSA_PK_LEN || sig_len != ZAULT_DSA_SIG_LEN {
            return ZAULT_INVALID_ARG;
        }
        let Some(pk_bytes) = (unsafe { slice_from_raw(dsa_pk_ptr, dsa_pk_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let Some(data) = (unsafe { slice_from_raw(data_ptr, data_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let Some(sig) = (unsafe { slice_from_raw(sig_ptr, sig_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let pk = match zault_core::crypto::mldsa::public_key_from_bytes(pk_bytes) {
            Ok(pk) => pk,
            Err(e) => return err_to_status(e),
        };
        if zault_core::crypto::mldsa::verify(&pk, data, sig) {
            ZAULT_OK
        } else {
            ZAULT_AUTH_FAILED
        }
    })
}

/// Writes the SHA3-256 hash of `data` to `out` (32 bytes).
#[no_mangle]
pub extern "C" fn zault_sha3_256(data_ptr: *const u8, data_len: usize, out_ptr: *mut u8, out_len: usize) -> i32 {
    guard(|| {
        if out_len < ZAULT_SHA3_256_LEN {
            return ZAULT_INVALID_ARG;
        }
        let Some(data) = (unsafe { slice_from_raw(data_ptr, data_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let hash = zault_core::crypto::sha3_256(data);
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..hash.len()].copy_from_slice(&hash);
        ZAULT_OK
    })
}

/// Fills `out` with `out_len` bytes of OS-backed randomness.
#[no_mangle]
pub extern "C" fn zault_random_bytes(out_ptr: *mut u8, out_len: usize) -> i32 {
    guard(|| {
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        use rand_core::RngCore;
        rand::rngs::OsRng.fill_bytes(out);
        ZAULT_OK
    })
}

/// Generates a fresh 32-byte symmetric group key for out-of-band
/// distribution among group-chat members.
#[no_mangle]
pub extern "C" fn zault_generate_group_key(out_ptr: *mut u8, out_len: usize) -> i32 {
    guard(|| {
        if out_len < ZAULT_GROUP_KEY_LEN {
            return ZAULT_INVALID_ARG;
        }
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let key = zault_core::crypto::random_key(&mut rand::rngs::OsRng);
        out[..key.len()].copy_from_slice(&key);
        ZAULT_OK
    })
}

/// ChaCha20-Poly1305-seals `plaintext` under `key` (32 bytes) with a fresh
/// nonce prepended to the ciphertext: `nonce ‖ aead_ciphertext`.
#[no_mangle]
pub extern "C" fn zault_encrypt_with_key(
    key_ptr: *const u8,
    key_len: usize,
    plaintext_ptr: *const u8,
    plaintext_len: usize,
    out_ptr: *mut u8,
    out_len: usize,
) -> i32 {
    guard(|| {
        if key_len != ZAULT_GROUP_KEY_LEN || out_len < plaintext_len + 12 + 16 {
            return ZAULT_INVALID_ARG;
        }
        let Some(key_bytes) = (unsafe { slice_from_raw(key_ptr, key_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let Some(plaintext) = (unsafe { slice_from_raw(plaintext_ptr, plaintext_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let mut key = [0u8; 32];
        key.copy_from_slice(key_bytes);
        let nonce = zault_core::crypto::random_nonce(&mut rand::rngs::OsRng);
        let ciphertext = match zault_core::crypto::aead_seal(&key, &nonce, plaintext) {
            Ok(c) => c,
            Err(e) => return err_to_status(e),
        };
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..12].copy_from_slice(&nonce);
        out[12..12 + ciphertext.len()].copy_from_slice(&ciphertext);
        ZAULT_OK
    })
}

#[no_mangle]
pub extern "C" fn zault_decrypt_with_key(
    key_ptr: *const u8,
    key_len: usize,
    ciphertext_ptr: *const u8,
    ciphertext_len: usize,
    out_ptr: *mut u8,
    out_len: usize,
    out_written: *mut usize,
) -> i32 {
    guard(|| {
        if key_len != ZAULT_GROUP_KEY_LEN || ciphertext_len < 12 + 16 || out_written.is_null() {
            return ZAULT_INVALID_ARG;
        }
        let Some(key_bytes) = (unsafe { slice_from_raw(key_ptr, key_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let Some(ciphertext) = (unsafe { slice_from_raw(ciphertext_ptr, ciphertext_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        let mut key = [0u8; 32];
        key.copy_from_slice(key_bytes);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&ciphertext[..12]);
        let plaintext = match zault_core::crypto::aead_open(&key, &nonce, &ciphertext[12..]) {
            Ok(p) => p,
            Err(e) => return err_to_status(e),
        };
        if out_len < plaintext.len() {
            return ZAULT_INVALID_ARG;
        }
        let Some(out) = (unsafe { slice_from_raw_mut(out_ptr, out_len) }) else {
            return ZAULT_INVALID_ARG;
        };
        out[..plaintext.len()].copy_from_slice(&plaintext);
        unsafe { *out_written = plaintext.len() };
        ZAULT_OK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_and_free_round_trips() {
        let mut handle: *mut ZaultIdentity = std::ptr::null_mut();
        assert_eq!(zault_identity_generate(&mut handle), ZAULT_OK);
        assert!(!handle.is_null());

        let mut public = [0u8; ZAULT_PUBLIC_IDENTITY_LEN];
        assert_eq!(
            zault_identity_serialize_public(handle, public.as_mut_ptr(), public.len()),
            ZAULT_OK
        );

        zault_identity_free(handle);
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let mut handle: *mut ZaultIdentity = std::ptr::null_mut();
        zault_identity_generate(&mut handle);

        let data = b"ffi signed payload";
        let mut sig = vec![0u8; ZAULT_DSA_SIG_LEN];
        assert_eq!(
            zault_sign(handle, data.as_ptr(), data.len(), sig.as_mut_ptr(), sig.len()),
            ZAULT_OK
        );

        let mut public = vec![0u8; ZAULT_PUBLIC_IDENTITY_LEN];
        zault_identity_serialize_public(handle, public.as_mut_ptr(), public.len());

        let mut dsa_pk = vec![0u8; ZAULT_DSA_PK_LEN];
        let mut kem_pk = vec![0u8; ZAULT_KEM_PK_LEN];
        zault_parse_public_identity(
            public.as_ptr(),
            public.len(),
            dsa_pk.as_mut_ptr(),
            dsa_pk.len(),
            kem_pk.as_mut_ptr(),
            kem_pk.len(),
        );

        assert_eq!(
            zault_verify(
                dsa_pk.as_ptr(),
                dsa_pk.len(),
                data.as_ptr(),
                data.len(),
                sig.as_ptr(),
                sig.len(),
            ),
            ZAULT_OK
        );

        zault_identity_free(handle);
    }

    #[test]
    fn encrypt_then_decrypt_message_round_trips() {
        let mut handle: *mut ZaultIdentity = std::ptr::null_mut();
        zault_identity_generate(&mut handle);

        let mut public = vec![0u8; ZAULT_PUBLIC_IDENTITY_LEN];
        zault_identity_serialize_public(handle, public.as_mut_ptr(), public.len());
        let mut dsa_pk = vec![0u8; ZAULT_DSA_PK_LEN];
        let mut kem_pk = vec![0u8; ZAULT_KEM_PK_LEN];
        zault_parse_public_identity(
            public.as_ptr(),
            public.len(),
            dsa_pk.as_mut_ptr(),
            dsa_pk.len(),
            kem_pk.as_mut_ptr(),
            kem_pk.len(),
        );

        let plaintext = b"hi";
        let mut ciphertext = vec![0u8; plaintext.len() + ZAULT_MESSAGE_OVERHEAD];
        assert_eq!(
            zault_encrypt_message(
                kem_pk.as_ptr(),
                kem_pk.len(),
                plaintext.as_ptr(),
                plaintext.len(),
                ciphertext.as_mut_ptr(),
                ciphertext.len(),
            ),
            ZAULT_OK
        );

        let mut out = vec![0u8; plaintext.len()];
        let mut written = 0usize;
        assert_eq!(
            zault_decrypt_message(
                handle,
                ciphertext.as_ptr(),
                ciphertext.len(),
                out.as_mut_ptr(),
                out.len(),
                &mut written,
            ),
            ZAULT_OK
        );
        assert_eq!(&out[..written], plaintext);

        zault_identity_free(handle);
    }
}
