use super::Aead;
use crate::error::{Error, Result};
use crate::primitive_set::PrimitiveSet;
use crate::registry::PrimitiveWrapper;
use tracing::warn;

/// Composes a set of AEADs into one.
///
/// Encryption uses the primary and prepends its output prefix. Decryption
/// tries every candidate key for the ciphertext's prefix, then every raw key,
/// primary first.
///
/// 将一组 AEAD 组合为一个。
///
/// 加密使用主密钥并在前面加上其输出前缀。解密先尝试与密文前缀匹配的每个候选密钥，
/// 然后尝试每个原始密钥，主密钥优先。
#[derive(Clone, Copy, Debug, Default)]
pub struct AeadWrapper;

impl PrimitiveWrapper for AeadWrapper {
    type Primitive = dyn Aead;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Aead>) -> Result<Box<dyn Aead>> {
        Ok(Box::new(WrappedAead { primitive_set }))
    }
}

struct WrappedAead {
    primitive_set: PrimitiveSet<dyn Aead>,
}

impl Aead for WrappedAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let primary = self.primitive_set.primary();
        let ciphertext = primary.primitive().encrypt(plaintext, associated_data)?;
        let mut output = Vec::with_capacity(primary.output_prefix().len() + ciphertext.len());
        output.extend_from_slice(primary.output_prefix());
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        for (entry, input) in self.primitive_set.candidates(ciphertext) {
            if let Ok(plaintext) = entry.primitive().decrypt(input, associated_data) {
                return Ok(plaintext);
            }
        }
        warn!(
            candidates = self.primitive_set.len(),
            "no key in the keyset could decrypt the ciphertext"
        );
        Err(Error::NoMatchingKey)
    }
}
