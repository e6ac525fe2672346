//! `seal-keyset` manages versioned sets of cryptographic keys and turns them
//! into ready-to-use primitives. A [`KeysetHandle`] owns a keyset and
//! validates it; a pluggable registry, either the process-wide [`Registry`]
//! or a caller-owned [`Configuration`], resolves each key to a primitive;
//! and a wrapper composes the per-key primitives into a single one that
//! encrypts, authenticates or signs with the primary key while still
//! accepting output produced by older keys.
//!
//! `seal-keyset` 管理带版本的密码学密钥集合，并将其转换为可直接使用的原语。
//! [`KeysetHandle`] 拥有并验证密钥集；可插拔的注册表（进程级的 [`Registry`]
//! 或调用方拥有的 [`Configuration`]）将每个密钥解析为原语；包装器将各个密钥的原语
//! 组合为一个，使用主密钥进行加密、认证或签名，同时仍接受旧密钥产生的输出。

pub mod aead;
mod common;
pub mod error;
pub mod insecure;
pub mod keyset;
pub mod keyset_handle;
pub mod keyset_manager;
pub mod mac;
pub mod primitive_set;
pub mod registry;
pub mod signature;

pub use error::{Error, Result};
pub use keyset::{KeyTemplate, MonitoringAnnotations};
pub use keyset_handle::KeysetHandle;
pub use keyset_manager::KeysetManager;
pub use registry::{Configuration, Registry};

/// Registers every built-in key manager and wrapper in the global registry.
///
/// Safe to call more than once.
///
/// 在全局注册表中注册所有内置密钥管理器和包装器。可以多次调用。
pub fn register_all() -> Result<()> {
    aead::register()?;
    mac::register()?;
    signature::register()
}

pub mod prelude {
    //! Commonly used types and traits.
    //!
    //! 常用的类型和 trait。
    pub use crate::aead::Aead;
    pub use crate::error::{Error, Result};
    pub use crate::keyset::io::{BinaryKeysetReader, BinaryKeysetWriter, KeysetReader, KeysetWriter};
    pub use crate::keyset::{KeyStatus, KeyTemplate, MonitoringAnnotations, OutputPrefixType};
    pub use crate::keyset_handle::KeysetHandle;
    pub use crate::keyset_manager::KeysetManager;
    pub use crate::mac::Mac;
    pub use crate::registry::{Configuration, Registry};
    pub use crate::signature::{Signer, Verifier};
}
