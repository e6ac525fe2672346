//! The extension points of the registry.
//!
//! A key type is plugged in by implementing [`KeyManager`] (which builds on
//! [`KeyFactory`]); a primitive interface is made composable by implementing
//! [`PrimitiveWrapper`]. Both traits name the primitive they deal in through
//! an associated type, so the registry can check at lookup time that a key
//! type produces the interface the caller asked for.
//!
//! 注册表的扩展点。
//!
//! 通过实现 [`KeyManager`]（构建于 [`KeyFactory`] 之上）来接入一种密钥类型；
//! 通过实现 [`PrimitiveWrapper`] 使一种原语接口可组合。两个 trait 都通过关联类型
//! 指明其处理的原语，因此注册表可以在查找时检查密钥类型是否产生调用方请求的接口。
use crate::error::{Error, Result};
use crate::keyset::{KeyData, KeyMaterialType, KeyTemplate};
use crate::primitive_set::PrimitiveSet;

/// Generates and derives key data for one key type, independent of the
/// primitive the key is later turned into.
///
/// 为一种密钥类型生成和派生密钥数据，与该密钥之后被转换成的原语无关。
pub trait KeyFactory: Send + Sync {
    /// The type URL this factory is registered under.
    fn type_url(&self) -> &str;

    /// The material class of the key data this factory produces.
    fn key_material_type(&self) -> KeyMaterialType;

    /// Generates fresh key data from a template of this key type.
    ///
    /// 根据此密钥类型的模板生成新的密钥数据。
    fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData>;

    /// Derives the public key data of a private key.
    ///
    /// Only managers of asymmetric private keys support this.
    ///
    /// 派生私钥的公钥数据。只有非对称私钥的管理器支持此操作。
    fn public_key_data(&self, _private_key_data: &KeyData) -> Result<KeyData> {
        Err(Error::NotAPrivateKeyset(self.type_url().to_string()))
    }
}

/// Turns key data of one type into a primitive of one interface.
///
/// 将一种类型的密钥数据转换为一种接口的原语。
pub trait KeyManager: KeyFactory {
    /// The primitive interface this manager constructs, e.g. `dyn Aead`.
    type Primitive: ?Sized + 'static;

    fn does_support(&self, type_url: &str) -> bool {
        type_url == self.type_url()
    }

    /// Builds a primitive from key data.
    ///
    /// 从密钥数据构建原语。
    fn primitive(&self, key_data: &KeyData) -> Result<Box<Self::Primitive>>;
}

/// Composes a [`PrimitiveSet`] into a single primitive of the same interface.
///
/// Implementations use the primary entry for operations that produce new
/// output and try [`PrimitiveSet::candidates`] in order for operations that
/// consume output, stopping at the first success.
///
/// 将 [`PrimitiveSet`] 组合为同一接口的单个原语。
///
/// 实现对产生新输出的操作使用主条目，对消费输出的操作按顺序尝试
/// [`PrimitiveSet::candidates`]，在第一次成功时停止。
pub trait PrimitiveWrapper: Send + Sync {
    type Primitive: ?Sized + 'static;

    fn wrap(&self, primitive_set: PrimitiveSet<Self::Primitive>)
        -> Result<Box<Self::Primitive>>;
}
