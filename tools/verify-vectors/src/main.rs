//! Standalone checker for the fixed derivation/framing test vectors a
//! conforming Zault implementation must reproduce bit-exact (§8, §4.2's
//! `from_seed` note: "two implementations that disagree cannot
//! interoperate"). Takes a JSON vectors file and recomputes each value
//! through `zault-core` itself, rather than a from-scratch reimplementation,
//! so this tool only ever catches a divergence between the vector file and
//! the shipped crate, never a transcription bug of its own.

use serde::Deserialize;
use zault_core::crypto;

#[derive(Deserialize)]
struct Vectors {
    vault_master_key: VaultMasterKeyVector,
    seed_sub_rng: SeedSubRngVector,
    aead: AeadVector,
}

#[derive(Deserialize)]
struct VaultMasterKeyVector {
    dsa_sk_hex: String,
    expected_master_key_hex: String,
}

#[derive(Deserialize)]
struct SeedSubRngVector {
    seed_hex: String,
    expected_dsa_sub_seed_hex: String,
    expected_kem_sub_seed_hex: String,
}

#[derive(Deserialize)]
struct AeadVector {
    key_hex: String,
    nonce_hex: String,
    plaintext_hex: String,
    expected_ciphertext_hex: String,
}

fn hex_to<const N: usize>(s: &str) -> anyhow::Result<[u8; N]> {
    let v = hex::decode(s)?;
    anyhow::ensure!(v.len() == N, "expected {N} bytes, got {}", v.len());
    let mut out = [0u8; N];
    out.copy_from_slice(&v);
    Ok(out)
}

fn check_vault_master_key(v: &VaultMasterKeyVector) -> anyhow::Result<()> {
    let dsa_sk = hex::decode(&v.dsa_sk_hex)?;
    let expected = hex_to::<32>(&v.expected_master_key_hex)?;
    let got = crypto::derive_vault_master_key(&dsa_sk);
    anyhow::ensure!(
        got == expected,
        "vault master key mismatch: got {}, expected {}",
        hex::encode(got),
        hex::encode(expected)
    );
    Ok(())
}

fn check_seed_sub_rng(v: &SeedSubRngVector) -> anyhow::Result<()> {
    use rand_core::RngCore;

    let seed = hex_to::<32>(&v.seed_hex)?;
    let expected_dsa = hex_to::<32>(&v.expected_dsa_sub_seed_hex)?;
    let expected_kem = hex_to::<32>(&v.expected_kem_sub_seed_hex)?;

    let (mut dsa_rng, mut kem_rng) = crypto::seed_sub_rngs(&seed)?;
    let mut dsa_out = [0u8; 32];
    dsa_rng.fill_bytes(&mut dsa_out);
    let mut kem_out = [0u8; 32];
    kem_rng.fill_bytes(&mut kem_out);

    // The sub-seeds feed a ChaCha20Rng rather than being consumed as opaque
    // bytes, so what's checked here is that the first output block of each
    // stream is stable across runs, which is what `from_seed` callers
    // actually depend on for reproducibility.
    anyhow::ensure!(
        dsa_out == expected_dsa,
        "dsa sub-rng first block mismatch: got {}, expected {}",
        hex::encode(dsa_out),
        hex::encode(expected_dsa)
    );
    anyhow::ensure!(
        kem_out == expected_kem,
        "kem sub-rng first block mismatch: got {}, expected {}",
        hex::encode(kem_out),
        hex::encode(expected_kem)
    );
    Ok(())
}

fn check_aead(v: &AeadVector) -> anyhow::Result<()> {
    let key = hex_to::<32>(&v.key_hex)?;
    let nonce = hex_to::<12>(&v.nonce_hex)?;
    let plaintext = hex::decode(&v.plaintext_hex)?;
    let expected = hex::decode(&v.expected_ciphertext_hex)?;

    let got = crypto::aead_seal(&key, &nonce, &plaintext)?;
    anyhow::ensure!(
        got == expected,
        "AEAD ciphertext mismatch: got {}, expected {}",
        hex::encode(&got),
        hex::encode(&expected)
    );
    let back = crypto::aead_open(&key, &nonce, &got)?;
    anyhow::ensure!(back == plaintext, "AEAD round trip did not recover plaintext");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: verify-vectors <vectors.json>");
    let data = std::fs::read_to_string(path)?;
    let vectors: Vectors = serde_json::from_str(&data)?;

    check_vault_master_key(&vectors.vault_master_key)?;
    check_seed_sub_rng(&vectors.seed_sub_rng)?;
    check_aead(&vectors.aead)?;

    println!("vectors OK");
    Ok(())
}
