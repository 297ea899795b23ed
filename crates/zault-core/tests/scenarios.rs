//! End-to-end vault scenarios, one test per literal scenario.

use zault_core::{Identity, Vault, ZaultError};

fn vault_at(dir: &std::path::Path) -> Vault {
    Vault::init(&dir.join("vault")).unwrap()
}

#[test]
fn s1_add_then_get_small_text_file() {
    let dir = tempfile::tempdir().unwrap();
    let vault = vault_at(dir.path());

    let src = dir.path().join("in.txt");
    std::fs::write(&src, b"test data for vault").unwrap();
    let hash = vault.add_file(&src, 0).unwrap();

    let out = dir.path().join("out.txt");
    vault.get_file(&hash, &out).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"test data for vault");
}

#[test]
fn s2_no_plaintext_survives_in_the_blocks_tree() {
    let dir = tempfile::tempdir().unwrap();
    let vault_dir = dir.path().join("vault");
    let vault = vault_at(dir.path());

    let zeros = dir.path().join("zeros.bin");
    std::fs::write(&zeros, vec![0u8; 1024 * 1024]).unwrap();
    vault.add_file(&zeros, 0).unwrap();

    let secret = dir.path().join("secret.txt");
    std::fs::write(&secret, b"Confidential Report").unwrap();
    vault.add_file(&secret, 0).unwrap();

    for entry in walk(&vault_dir.join("blocks")) {
        let bytes = std::fs::read(&entry).unwrap();
        assert!(!contains(&bytes, b"Confidential Report"));
    }
}

fn walk(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_dir() {
            out.extend(walk(&entry.path()));
        } else {
            out.push(entry.path());
        }
    }
    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn s3_flipping_a_byte_of_the_metadata_block_breaks_verify() {
    let dir = tempfile::tempdir().unwrap();
    let vault_dir = dir.path().join("vault");
    let vault = vault_at(dir.path());

    let src = dir.path().join("hello.txt");
    std::fs::write(&src, b"hello").unwrap();
    let hash = vault.add_file(&src, 0).unwrap();

    let hex = hex::encode(hash);
    let block_path = vault_dir.join("blocks").join(&hex[0..2]).join(&hex);
    let mut bytes = std::fs::read(&block_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&block_path, bytes).unwrap();

    assert!(matches!(vault.verify(&hash), Err(ZaultError::SignatureInvalid)));
}

#[test]
fn s4_from_seed_is_reproducible_across_separate_instances() {
    let seed = [0x42u8; 32];
    let a = Identity::from_seed(&seed).unwrap();
    let b = Identity::from_seed(&seed).unwrap();
    assert_eq!(a.public().to_bytes(), b.public().to_bytes());
}

#[test]
fn s5_message_decrypts_only_for_the_intended_recipient() {
    let a = Identity::from_seed(&[10u8; 32]).unwrap();
    let b = Identity::from_seed(&[20u8; 32]).unwrap();

    let ciphertext = zault_core::encrypt_message(&b.kem_pk, b"hi");
    assert_eq!(zault_core::decrypt_message(&b, &ciphertext).unwrap(), b"hi");
    assert!(zault_core::decrypt_message(&a, &ciphertext).is_err());
}

#[test]
fn s6_list_reports_three_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let vault = vault_at(dir.path());

    let mut added = Vec::new();
    for (name, contents) in [
        ("one.txt", "one"),
        ("two.txt", "two"),
        ("three.txt", "three"),
    ] {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        added.push((name.to_string(), vault.add_file(&path, 0).unwrap()));
    }

    let entries = vault.list().unwrap();
    assert_eq!(entries.len(), 3);
    for (name, hash) in added {
        assert!(entries.iter().any(|e| e.filename == name && e.hash == hash));
    }
}
