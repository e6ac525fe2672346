use super::cipher::AeadCipher;
use super::Aead;
use crate::common;
use crate::error::{FormatError, Result};
use crate::keyset::{KeyData, KeyMaterialType, KeyTemplate};
use crate::registry::{KeyFactory, KeyManager};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use bincode::{Decode, Encode};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const AES_GCM_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesGcmKey";

const VERSION: u32 = 0;

/// Parameters of an AES-GCM key template.
///
/// AES-GCM 密钥模板的参数。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct AesGcmKeyFormat {
    /// Key size in bytes: 16 or 32.
    pub key_size: u32,
}

impl AesGcmKeyFormat {
    /// Serializes the format into a template value.
    ///
    /// 将格式序列化为模板值。
    pub fn encode(&self) -> Result<Vec<u8>> {
        common::encode_to_vec(self)
    }

    fn validate(&self) -> Result<()> {
        match self.key_size {
            16 | 32 => Ok(()),
            _ => Err(FormatError::InvalidKeyFormat(AES_GCM_TYPE_URL.to_string()).into()),
        }
    }
}

#[derive(Encode, Decode, Zeroize, ZeroizeOnDrop)]
struct AesGcmKey {
    #[zeroize(skip)]
    version: u32,
    key_value: Vec<u8>,
}

/// Key manager for AES-GCM with 128- or 256-bit keys.
///
/// 128 位或 256 位密钥的 AES-GCM 密钥管理器。
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcmKeyManager;

impl KeyFactory for AesGcmKeyManager {
    fn type_url(&self) -> &str {
        AES_GCM_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        let format: AesGcmKeyFormat = common::decode_from_slice(&template.value)
            .map_err(|_| FormatError::InvalidKeyFormat(AES_GCM_TYPE_URL.to_string()))?;
        format.validate()?;
        let key = AesGcmKey {
            version: VERSION,
            key_value: common::random_bytes(format.key_size as usize)?,
        };
        Ok(KeyData::new(
            AES_GCM_TYPE_URL,
            common::encode_to_vec(&key)?,
            KeyMaterialType::Symmetric,
        ))
    }
}

impl KeyManager for AesGcmKeyManager {
    type Primitive = dyn Aead;

    fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Aead>> {
        let key: AesGcmKey = common::decode_from_slice(key_data.value())
            .map_err(|_| FormatError::InvalidKeyMaterial(AES_GCM_TYPE_URL.to_string()))?;
        if key.version != VERSION {
            return Err(FormatError::InvalidKeyMaterial(AES_GCM_TYPE_URL.to_string()).into());
        }
        match key.key_value.len() {
            16 => Ok(Box::new(AeadCipher::<Aes128Gcm>::new(
                &key.key_value,
                AES_GCM_TYPE_URL,
            )?)),
            32 => Ok(Box::new(AeadCipher::<Aes256Gcm>::new(
                &key.key_value,
                AES_GCM_TYPE_URL,
            )?)),
            _ => Err(FormatError::InvalidKeyMaterial(AES_GCM_TYPE_URL.to_string()).into()),
        }
    }
}
