//! Message authentication codes: the [`Mac`] interface, an HMAC-SHA256 key
//! manager and the [`MacWrapper`].
//!
//! 消息认证码：[`Mac`] 接口、HMAC-SHA256 密钥管理器和 [`MacWrapper`]。
use crate::common;
use crate::error::{CryptoError, Error, FormatError, Result};
use crate::keyset::{KeyData, KeyMaterialType, KeyTemplate, OutputPrefixType};
use crate::primitive_set::PrimitiveSet;
use crate::registry::{
    Configuration, KeyFactory, KeyManager, PrimitiveWrapper, Registry, RegistryImpl,
};
use bincode::{Decode, Encode};
use hmac::{Hmac, Mac as _};
use sha2::Sha256;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const HMAC_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.HmacKey";

const VERSION: u32 = 0;
const MIN_KEY_SIZE: u32 = 16;
const MIN_TAG_SIZE: u32 = 16;
const MAX_TAG_SIZE: u32 = 32;

type HmacSha256 = Hmac<Sha256>;

/// Computes and verifies authentication tags.
///
/// 计算并验证认证标签。
pub trait Mac: Send + Sync {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Succeeds only if `mac` is a valid tag for `data`.
    ///
    /// 只有当 `mac` 是 `data` 的有效标签时才成功。
    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> Result<()>;
}

/// Parameters of an HMAC-SHA256 key template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct HmacKeyFormat {
    pub key_size: u32,
    pub tag_size: u32,
}

impl HmacKeyFormat {
    /// Serializes the format into a template value.
    pub fn encode(&self) -> Result<Vec<u8>> {
        common::encode_to_vec(self)
    }
}

fn validate_sizes(key_size: usize, tag_size: u32) -> Result<()> {
    if key_size < MIN_KEY_SIZE as usize || !(MIN_TAG_SIZE..=MAX_TAG_SIZE).contains(&tag_size) {
        return Err(FormatError::InvalidKeyFormat(HMAC_TYPE_URL.to_string()).into());
    }
    Ok(())
}

#[derive(Encode, Decode, Zeroize, ZeroizeOnDrop)]
struct HmacKey {
    #[zeroize(skip)]
    version: u32,
    #[zeroize(skip)]
    tag_size: u32,
    key_value: Vec<u8>,
}

struct HmacSha256Mac {
    key: Zeroizing<Vec<u8>>,
    tag_size: usize,
}

impl HmacSha256Mac {
    fn mac(&self, data: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| FormatError::InvalidKeyMaterial(HMAC_TYPE_URL.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

impl Mac for HmacSha256Mac {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let tag = self.mac(data)?.finalize().into_bytes();
        Ok(tag[..self.tag_size].to_vec())
    }

    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> Result<()> {
        if mac.len() != self.tag_size {
            return Err(CryptoError::InvalidMac.into());
        }
        self.mac(data)?
            .verify_truncated_left(mac)
            .map_err(|_| Error::Crypto(CryptoError::InvalidMac))
    }
}

/// Key manager for HMAC-SHA256 with a configurable tag size.
///
/// 可配置标签长度的 HMAC-SHA256 密钥管理器。
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSha256KeyManager;

impl KeyFactory for HmacSha256KeyManager {
    fn type_url(&self) -> &str {
        HMAC_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        let format: HmacKeyFormat = common::decode_from_slice(&template.value)
            .map_err(|_| FormatError::InvalidKeyFormat(HMAC_TYPE_URL.to_string()))?;
        validate_sizes(format.key_size as usize, format.tag_size)?;
        let key = HmacKey {
            version: VERSION,
            tag_size: format.tag_size,
            key_value: common::random_bytes(format.key_size as usize)?,
        };
        Ok(KeyData::new(
            HMAC_TYPE_URL,
            common::encode_to_vec(&key)?,
            KeyMaterialType::Symmetric,
        ))
    }
}

impl KeyManager for HmacSha256KeyManager {
    type Primitive = dyn Mac;

    fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Mac>> {
        let key: HmacKey = common::decode_from_slice(key_data.value())
            .map_err(|_| FormatError::InvalidKeyMaterial(HMAC_TYPE_URL.to_string()))?;
        if key.version != VERSION {
            return Err(FormatError::InvalidKeyMaterial(HMAC_TYPE_URL.to_string()).into());
        }
        validate_sizes(key.key_value.len(), key.tag_size)
            .map_err(|_| FormatError::InvalidKeyMaterial(HMAC_TYPE_URL.to_string()))?;
        Ok(Box::new(HmacSha256Mac {
            key: Zeroizing::new(key.key_value.clone()),
            tag_size: key.tag_size as usize,
        }))
    }
}

/// Composes a set of MACs into one.
///
/// Tags are prefixed with the primary's output prefix. Keys with the
/// `Legacy` prefix authenticate `data || 0x00` instead of `data`.
///
/// 将一组 MAC 组合为一个。
///
/// 标签以主密钥的输出前缀开头。使用 `Legacy` 前缀的密钥认证 `data || 0x00` 而不是 `data`。
#[derive(Clone, Copy, Debug, Default)]
pub struct MacWrapper;

impl PrimitiveWrapper for MacWrapper {
    type Primitive = dyn Mac;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Mac>) -> Result<Box<dyn Mac>> {
        Ok(Box::new(WrappedMac { primitive_set }))
    }
}

struct WrappedMac {
    primitive_set: PrimitiveSet<dyn Mac>,
}

fn authenticated_data(output_prefix_type: OutputPrefixType, data: &[u8]) -> Vec<u8> {
    let mut input = data.to_vec();
    if output_prefix_type == OutputPrefixType::Legacy {
        input.push(0x00);
    }
    input
}

impl Mac for WrappedMac {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let primary = self.primitive_set.primary();
        let input = authenticated_data(primary.output_prefix_type(), data);
        let tag = primary.primitive().compute_mac(&input)?;
        let mut output = primary.output_prefix().to_vec();
        output.extend_from_slice(&tag);
        Ok(output)
    }

    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> Result<()> {
        for (entry, tag) in self.primitive_set.candidates(mac) {
            let input = authenticated_data(entry.output_prefix_type(), data);
            if entry.primitive().verify_mac(tag, &input).is_ok() {
                return Ok(());
            }
        }
        warn!(
            candidates = self.primitive_set.len(),
            "no key in the keyset could verify the mac"
        );
        Err(Error::NoMatchingKey)
    }
}

pub(crate) fn install(registry: &mut RegistryImpl) -> Result<()> {
    registry.register_key_manager(HmacSha256KeyManager)?;
    registry.register_primitive_wrapper(MacWrapper)
}

/// Registers the MAC key manager and wrapper in the global registry.
pub fn register() -> Result<()> {
    install(&mut Registry::write())
}

pub fn register_in(config: &mut Configuration) -> Result<()> {
    install(config.registry_mut())
}

fn hmac_template(key_size: u32, tag_size: u32) -> Result<KeyTemplate> {
    Ok(KeyTemplate::new(
        HMAC_TYPE_URL,
        HmacKeyFormat { key_size, tag_size }.encode()?,
        OutputPrefixType::Tink,
    ))
}

/// HMAC-SHA256, 32-byte key, 32-byte tag.
pub fn hmac_sha256_tag256() -> Result<KeyTemplate> {
    hmac_template(32, 32)
}

/// HMAC-SHA256, 32-byte key, 16-byte tag.
pub fn hmac_sha256_tag128() -> Result<KeyTemplate> {
    hmac_template(32, 16)
}
