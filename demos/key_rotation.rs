//! Rotates the key of an AEAD keyset and persists it encrypted under a
//! master key.
//!
//! Run with `cargo run --example key_rotation`.

use seal_keyset::aead::{self, Aead};
use seal_keyset::keyset::io::{BinaryKeysetReader, BinaryKeysetWriter};
use seal_keyset::{KeysetHandle, KeysetManager, MonitoringAnnotations};

fn main() -> seal_keyset::Result<()> {
    seal_keyset::register_all()?;

    // The master key would normally live in a KMS.
    let master = KeysetHandle::generate_new(&aead::aes256_gcm()?, MonitoringAnnotations::new())?
        .primitive::<dyn Aead>()?;

    let handle = KeysetHandle::generate_new(&aead::aes128_gcm()?, MonitoringAnnotations::new())?;
    let first_key = handle.primary().id();
    let old_ciphertext = handle
        .primitive::<dyn Aead>()?
        .encrypt(b"written before rotation", b"demo")?;
    println!("created keyset with primary key {first_key}");

    let mut manager = KeysetManager::from_handle(&handle);
    let second_key = manager.add(&aead::aes256_gcm()?)?;
    manager.set_primary(second_key)?;
    let rotated = manager.handle()?;
    println!("rotated primary to key {second_key}");

    let aead = rotated.primitive::<dyn Aead>()?;
    let plaintext = aead.decrypt(&old_ciphertext, b"demo")?;
    println!(
        "old ciphertext still decrypts: {}",
        String::from_utf8_lossy(&plaintext)
    );

    let mut writer = BinaryKeysetWriter::new(Vec::new());
    rotated.write(&mut writer, master.as_ref())?;
    let stored = writer.into_inner();
    println!("stored encrypted keyset ({} bytes)", stored.len());

    let mut reader = BinaryKeysetReader::new(stored.as_slice());
    let restored = KeysetHandle::read(&mut reader, master.as_ref(), MonitoringAnnotations::new())?;
    for key in restored.keyset_info().key_info {
        println!("  key {} {:?} {}", key.key_id, key.status, key.type_url);
    }
    Ok(())
}
