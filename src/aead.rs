//! Authenticated encryption with associated data.
//!
//! Provides the [`Aead`] interface, key managers for AES-GCM,
//! ChaCha20-Poly1305 and XChaCha20-Poly1305, the [`AeadWrapper`] that composes
//! them over a keyset, and ready-made key templates.
//!
//! 带关联数据的认证加密。
//!
//! 提供 [`Aead`] 接口、AES-GCM、ChaCha20-Poly1305 和 XChaCha20-Poly1305 的密钥管理器、
//! 在密钥集上组合它们的 [`AeadWrapper`]，以及现成的密钥模板。
use crate::error::Result;
use crate::keyset::{KeyTemplate, OutputPrefixType};
use crate::registry::{Configuration, Registry, RegistryImpl};

mod chacha;
mod cipher;
mod gcm;
mod wrapper;

pub use chacha::{
    ChaCha20Poly1305KeyManager, XChaCha20Poly1305KeyManager, CHACHA20_POLY1305_TYPE_URL,
    XCHACHA20_POLY1305_TYPE_URL,
};
pub use gcm::{AesGcmKeyFormat, AesGcmKeyManager, AES_GCM_TYPE_URL};
pub use wrapper::AeadWrapper;

/// Encrypts and authenticates data, binding it to `associated_data`.
///
/// 加密并认证数据，并将其绑定到 `associated_data`。
pub trait Aead: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;
}

pub(crate) fn install(registry: &mut RegistryImpl) -> Result<()> {
    registry.register_key_manager(AesGcmKeyManager)?;
    registry.register_key_manager(ChaCha20Poly1305KeyManager)?;
    registry.register_key_manager(XChaCha20Poly1305KeyManager)?;
    registry.register_primitive_wrapper(AeadWrapper)
}

/// Registers the AEAD key managers and wrapper in the global registry.
///
/// 在全局注册表中注册 AEAD 密钥管理器和包装器。
pub fn register() -> Result<()> {
    install(&mut Registry::write())
}

/// Registers the AEAD key managers and wrapper in `config`.
pub fn register_in(config: &mut Configuration) -> Result<()> {
    install(config.registry_mut())
}

fn aes_gcm_template(key_size: u32) -> Result<KeyTemplate> {
    Ok(KeyTemplate::new(
        AES_GCM_TYPE_URL,
        AesGcmKeyFormat { key_size }.encode()?,
        OutputPrefixType::Tink,
    ))
}

/// AES-128-GCM with a Tink output prefix.
pub fn aes128_gcm() -> Result<KeyTemplate> {
    aes_gcm_template(16)
}

/// AES-256-GCM with a Tink output prefix.
pub fn aes256_gcm() -> Result<KeyTemplate> {
    aes_gcm_template(32)
}

pub fn chacha20_poly1305() -> KeyTemplate {
    KeyTemplate::new(CHACHA20_POLY1305_TYPE_URL, Vec::new(), OutputPrefixType::Tink)
}

pub fn xchacha20_poly1305() -> KeyTemplate {
    KeyTemplate::new(XCHACHA20_POLY1305_TYPE_URL, Vec::new(), OutputPrefixType::Tink)
}
