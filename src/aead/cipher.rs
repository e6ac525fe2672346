use super::Aead;
use crate::common;
use crate::error::{CryptoError, Error, FormatError, Result};
use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{AeadCore, KeyInit, Nonce, Payload};

/// A single-key AEAD over any RustCrypto cipher.
///
/// Output layout: `nonce || ciphertext || tag`, with a fresh random nonce
/// per message.
///
/// 基于任意 RustCrypto 密码的单密钥 AEAD。
///
/// 输出布局：`nonce || ciphertext || tag`，每条消息使用新的随机 nonce。
pub(crate) struct AeadCipher<C> {
    cipher: C,
}

impl<C> AeadCipher<C>
where
    C: aes_gcm::aead::Aead + KeyInit,
{
    pub(crate) fn new(key: &[u8], type_url: &str) -> Result<Self> {
        let cipher = C::new_from_slice(key)
            .map_err(|_| FormatError::InvalidKeyMaterial(type_url.to_string()))?;
        Ok(Self { cipher })
    }

    fn nonce_size() -> usize {
        <C as AeadCore>::NonceSize::USIZE
    }

    fn tag_size() -> usize {
        <C as AeadCore>::TagSize::USIZE
    }
}

impl<C> Aead for AeadCipher<C>
where
    C: aes_gcm::aead::Aead + KeyInit + Send + Sync,
{
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let mut output = common::random_bytes(Self::nonce_size())?;
        let nonce = Nonce::<C>::from_slice(&output);
        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < Self::nonce_size() + Self::tag_size() {
            return Err(Error::Format(FormatError::InvalidCiphertext));
        }
        let (nonce, body) = ciphertext.split_at(Self::nonce_size());
        self.cipher
            .decrypt(
                Nonce::<C>::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: associated_data,
                },
            )
            .map_err(|_| Error::Crypto(CryptoError::DecryptionFailed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::Aes128Gcm;
    use chacha20poly1305::XChaCha20Poly1305;

    #[test]
    fn test_nonce_is_prepended() {
        let aead = AeadCipher::<Aes128Gcm>::new(&[3; 16], "test").unwrap();
        let ciphertext = aead.encrypt(b"hello", b"ad").unwrap();
        assert_eq!(ciphertext.len(), 12 + 5 + 16);
        assert_eq!(aead.decrypt(&ciphertext, b"ad").unwrap(), b"hello");
    }

    #[test]
    fn test_nonces_differ() {
        let aead = AeadCipher::<XChaCha20Poly1305>::new(&[9; 32], "test").unwrap();
        let a = aead.encrypt(b"same", b"").unwrap();
        let b = aead.encrypt(b"same", b"").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 24 + 4 + 16);
    }

    #[test]
    fn test_tampering_and_wrong_ad_fail() {
        let aead = AeadCipher::<Aes128Gcm>::new(&[3; 16], "test").unwrap();
        let mut ciphertext = aead.encrypt(b"hello", b"ad").unwrap();
        assert!(matches!(
            aead.decrypt(&ciphertext, b"other"),
            Err(Error::Crypto(CryptoError::DecryptionFailed))
        ));
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 1;
        assert!(aead.decrypt(&ciphertext, b"ad").is_err());
        assert!(matches!(
            aead.decrypt(&ciphertext[..10], b"ad"),
            Err(Error::Format(FormatError::InvalidCiphertext))
        ));
    }

    #[test]
    fn test_wrong_key_length() {
        assert!(AeadCipher::<Aes128Gcm>::new(&[0; 15], "test").is_err());
    }
}
