//! The in-memory keyset model.
//!
//! A [`Keyset`] is an ordered list of [`KeyEntry`] values plus the id of the
//! primary key. The model holds data only; structural rules live in
//! [`validation`] and persistence in [`io`].
//!
//! 内存中的密钥集模型。
//!
//! [`Keyset`] 是 [`KeyEntry`] 的有序列表加上主密钥的 ID。
//! 该模型只保存数据；结构规则位于 [`validation`]，持久化位于 [`io`]。
use crate::common;
use crate::error::Result;
use bincode::{Decode, Encode};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod io;
pub mod validation;

/// Opaque metadata attached to a keyset handle for usage telemetry.
///
/// 附加到密钥集句柄上、用于使用情况遥测的不透明元数据。
pub type MonitoringAnnotations = HashMap<String, String>;

/// Whether a key may still be used.
///
/// 密钥是否仍可使用。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Decode, Encode)]
pub enum KeyStatus {
    Unknown,
    Enabled,
    Disabled,
    Destroyed,
}

/// How the output of a composite primitive is tagged with the producing key.
///
/// 复合原语的输出如何用生成它的密钥进行标记。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Decode, Encode)]
pub enum OutputPrefixType {
    Unknown,
    /// `0x01 || key_id`.
    Tink,
    /// `0x00 || key_id`.
    Legacy,
    /// No prefix.
    Raw,
    /// `0x00 || key_id`, without the legacy data suffix.
    Crunchy,
}

/// Classification of the material held by a key.
///
/// 密钥所持有材料的分类。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Decode, Encode)]
pub enum KeyMaterialType {
    UnknownKeymaterial,
    Symmetric,
    AsymmetricPrivate,
    AsymmetricPublic,
    /// The material only references a key held elsewhere (e.g. in a KMS).
    Remote,
}

impl KeyMaterialType {
    /// Returns `true` if keys of this class must never leave the process in cleartext.
    ///
    /// 如果此类密钥绝不能以明文形式离开进程，则返回 `true`。
    pub fn is_secret(self) -> bool {
        matches!(
            self,
            Self::UnknownKeymaterial | Self::Symmetric | Self::AsymmetricPrivate
        )
    }
}

/// Typed key material: the type URL selects the key manager, the value is
/// only interpreted by that manager.
///
/// The value is wiped on drop and never printed by `Debug`.
///
/// 带类型的密钥材料：类型 URL 选择密钥管理器，值只由该管理器解释。
///
/// 该值在释放时被擦除，且永远不会被 `Debug` 打印。
#[derive(Clone, PartialEq, Eq, Decode, Encode, Zeroize, ZeroizeOnDrop)]
pub struct KeyData {
    type_url: String,
    value: Vec<u8>,
    #[zeroize(skip)]
    key_material_type: KeyMaterialType,
}

impl KeyData {
    pub fn new(
        type_url: impl Into<String>,
        value: Vec<u8>,
        key_material_type: KeyMaterialType,
    ) -> Self {
        Self {
            type_url: type_url.into(),
            value,
            key_material_type,
        }
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// The serialized key material. Only key managers should interpret it.
    ///
    /// 序列化的密钥材料。只有密钥管理器应该解释它。
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn key_material_type(&self) -> KeyMaterialType {
        self.key_material_type
    }

    /// Wipes the key material, keeping the type information.
    pub(crate) fn wipe(&mut self) {
        self.value.zeroize();
    }
}

impl fmt::Debug for KeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyData")
            .field("type_url", &self.type_url)
            .field("value", &"<redacted>")
            .field("key_material_type", &self.key_material_type)
            .finish()
    }
}

/// One key inside a keyset.
///
/// 密钥集中的一个密钥。
#[derive(Clone, Debug, PartialEq, Eq, Decode, Encode)]
pub struct KeyEntry {
    pub key_data: KeyData,
    pub status: KeyStatus,
    pub key_id: u32,
    pub output_prefix_type: OutputPrefixType,
}

impl KeyEntry {
    /// Returns the material-free description of this key.
    ///
    /// 返回此密钥不含材料的描述。
    pub fn key_info(&self) -> KeyInfo {
        KeyInfo {
            type_url: self.key_data.type_url().to_string(),
            status: self.status,
            key_id: self.key_id,
            output_prefix_type: self.output_prefix_type,
        }
    }
}

/// An ordered collection of keys plus the id of the primary key.
///
/// Nothing here enforces the keyset invariants: duplicate ids, a missing
/// primary or several primaries can all exist in memory until
/// [`validation::validate_keyset`] is run.
///
/// 有序的密钥集合以及主密钥的 ID。
///
/// 这里不强制密钥集不变量：在运行 [`validation::validate_keyset`] 之前，
/// 重复的 ID、缺失的主密钥或多个主密钥都可以存在于内存中。
#[derive(Clone, Debug, Default, PartialEq, Eq, Decode, Encode)]
pub struct Keyset {
    pub primary_key_id: u32,
    pub keys: Vec<KeyEntry>,
}

impl Keyset {
    /// Encodes the keyset into a byte vector.
    ///
    /// 将密钥集编码为字节向量。
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        common::encode_to_vec(self)
    }

    /// Decodes a keyset from a byte slice.
    ///
    /// 从字节切片解码密钥集。
    pub fn decode_from_slice(data: &[u8]) -> Result<Self> {
        common::decode_from_slice(data)
    }

    /// Returns the first key with the given id.
    pub fn find(&self, key_id: u32) -> Option<&KeyEntry> {
        self.keys.iter().find(|key| key.key_id == key_id)
    }

    pub fn contains_key_id(&self, key_id: u32) -> bool {
        self.find(key_id).is_some()
    }

    /// Returns a projection of the keyset that carries no key material and is
    /// safe to log.
    ///
    /// 返回不携带密钥材料、可以安全记录日志的密钥集投影。
    pub fn keyset_info(&self) -> KeysetInfo {
        KeysetInfo {
            primary_key_id: self.primary_key_id,
            key_info: self.keys.iter().map(KeyEntry::key_info).collect(),
        }
    }
}

/// Material-free metadata about one key.
///
/// 关于单个密钥的不含材料的元数据。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Decode, Encode)]
pub struct KeyInfo {
    pub type_url: String,
    pub status: KeyStatus,
    pub key_id: u32,
    pub output_prefix_type: OutputPrefixType,
}

/// Material-free metadata about a keyset.
///
/// 关于密钥集的不含材料的元数据。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq, Decode, Encode)]
pub struct KeysetInfo {
    pub primary_key_id: u32,
    pub key_info: Vec<KeyInfo>,
}

/// A keyset encrypted under a master AEAD, plus its cleartext metadata.
///
/// 在主 AEAD 下加密的密钥集及其明文元数据。
#[derive(Clone, Debug, PartialEq, Eq, Decode, Encode)]
pub struct EncryptedKeyset {
    pub encrypted_keyset: Vec<u8>,
    pub keyset_info: Option<KeysetInfo>,
}

impl EncryptedKeyset {
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        common::encode_to_vec(self)
    }

    pub fn decode_from_slice(data: &[u8]) -> Result<Self> {
        common::decode_from_slice(data)
    }
}

/// Describes a key to be generated: which key manager, which parameters and
/// which output prefix.
///
/// 描述要生成的密钥：使用哪个密钥管理器、哪些参数以及哪种输出前缀。
#[derive(Clone, Debug, PartialEq, Eq, Decode, Encode)]
pub struct KeyTemplate {
    pub type_url: String,
    /// Manager-specific serialized key format.
    pub value: Vec<u8>,
    pub output_prefix_type: OutputPrefixType,
}

impl KeyTemplate {
    pub fn new(
        type_url: impl Into<String>,
        value: Vec<u8>,
        output_prefix_type: OutputPrefixType,
    ) -> Self {
        Self {
            type_url: type_url.into(),
            value,
            output_prefix_type,
        }
    }

    /// Returns the same template with a different output prefix.
    ///
    /// 返回具有不同输出前缀的相同模板。
    pub fn with_output_prefix(mut self, output_prefix_type: OutputPrefixType) -> Self {
        self.output_prefix_type = output_prefix_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key_id: u32, status: KeyStatus) -> KeyEntry {
        KeyEntry {
            key_data: KeyData::new(
                "test.Key",
                vec![0xAB; 16],
                KeyMaterialType::Symmetric,
            ),
            status,
            key_id,
            output_prefix_type: OutputPrefixType::Tink,
        }
    }

    #[test]
    fn test_key_data_debug_redacts_material() {
        let data = KeyData::new("test.Key", vec![0xAB; 4], KeyMaterialType::Symmetric);
        let printed = format!("{data:?}");
        assert!(printed.contains("test.Key"));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("171"), "material bytes leaked: {printed}");
    }

    #[test]
    fn test_wipe_clears_material() {
        let mut data = KeyData::new("test.Key", vec![1, 2, 3], KeyMaterialType::Symmetric);
        data.wipe();
        assert!(data.value().is_empty());
        assert_eq!(data.type_url(), "test.Key");
    }

    #[test]
    fn test_keyset_codec() {
        let keyset = Keyset {
            primary_key_id: 42,
            keys: vec![entry(42, KeyStatus::Enabled), entry(7, KeyStatus::Disabled)],
        };
        let bytes = keyset.encode_to_vec().unwrap();
        let decoded = Keyset::decode_from_slice(&bytes).unwrap();
        assert_eq!(decoded, keyset);
    }

    #[test]
    fn test_keyset_info_has_no_material() {
        let keyset = Keyset {
            primary_key_id: 42,
            keys: vec![entry(42, KeyStatus::Enabled)],
        };
        let info = keyset.keyset_info();
        assert_eq!(info.primary_key_id, 42);
        assert_eq!(
            info.key_info,
            vec![KeyInfo {
                type_url: "test.Key".to_string(),
                status: KeyStatus::Enabled,
                key_id: 42,
                output_prefix_type: OutputPrefixType::Tink,
            }]
        );
    }

    #[test]
    fn test_secret_classification() {
        assert!(KeyMaterialType::Symmetric.is_secret());
        assert!(KeyMaterialType::AsymmetricPrivate.is_secret());
        assert!(KeyMaterialType::UnknownKeymaterial.is_secret());
        assert!(!KeyMaterialType::AsymmetricPublic.is_secret());
        assert!(!KeyMaterialType::Remote.is_secret());
    }
}
