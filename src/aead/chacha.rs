use super::cipher::AeadCipher;
use super::Aead;
use crate::common;
use crate::error::{FormatError, Result};
use crate::keyset::{KeyData, KeyMaterialType, KeyTemplate};
use crate::registry::{KeyFactory, KeyManager};
use bincode::{Decode, Encode};
use chacha20poly1305::{ChaCha20Poly1305, XChaCha20Poly1305};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const CHACHA20_POLY1305_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.ChaCha20Poly1305Key";
pub const XCHACHA20_POLY1305_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.XChaCha20Poly1305Key";

const VERSION: u32 = 0;
const KEY_SIZE: usize = 32;

#[derive(Encode, Decode, Zeroize, ZeroizeOnDrop)]
struct ChaChaKey {
    #[zeroize(skip)]
    version: u32,
    key_value: Vec<u8>,
}

macro_rules! impl_chacha_key_manager {
    ($manager:ident, $cipher:ty, $type_url:expr) => {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $manager;

        impl KeyFactory for $manager {
            fn type_url(&self) -> &str {
                $type_url
            }

            fn key_material_type(&self) -> KeyMaterialType {
                KeyMaterialType::Symmetric
            }

            fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
                if !template.value.is_empty() {
                    return Err(FormatError::InvalidKeyFormat($type_url.to_string()).into());
                }
                let key = ChaChaKey {
                    version: VERSION,
                    key_value: common::random_bytes(KEY_SIZE)?,
                };
                Ok(KeyData::new(
                    $type_url,
                    common::encode_to_vec(&key)?,
                    KeyMaterialType::Symmetric,
                ))
            }
        }

        impl KeyManager for $manager {
            type Primitive = dyn Aead;

            fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Aead>> {
                let key: ChaChaKey = common::decode_from_slice(key_data.value())
                    .map_err(|_| FormatError::InvalidKeyMaterial($type_url.to_string()))?;
                if key.version != VERSION || key.key_value.len() != KEY_SIZE {
                    return Err(FormatError::InvalidKeyMaterial($type_url.to_string()).into());
                }
                Ok(Box::new(AeadCipher::<$cipher>::new(
                    &key.key_value,
                    $type_url,
                )?))
            }
        }
    };
}

impl_chacha_key_manager!(
    ChaCha20Poly1305KeyManager,
    ChaCha20Poly1305,
    CHACHA20_POLY1305_TYPE_URL
);
impl_chacha_key_manager!(
    XChaCha20Poly1305KeyManager,
    XChaCha20Poly1305,
    XCHACHA20_POLY1305_TYPE_URL
);
