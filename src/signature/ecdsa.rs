//! ECDSA over NIST P-256 with SHA-256 and DER-encoded signatures.
//!
//! 基于 NIST P-256、SHA-256 和 DER 编码签名的 ECDSA。
use super::{Signer, Verifier};
use crate::common;
use crate::error::{CryptoError, Error, FormatError, Result};
use crate::keyset::{KeyData, KeyMaterialType, KeyTemplate};
use crate::registry::{KeyFactory, KeyManager};
use bincode::{Decode, Encode};
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const ECDSA_PRIVATE_KEY_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.EcdsaPrivateKey";
pub const ECDSA_PUBLIC_KEY_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.EcdsaPublicKey";

const VERSION: u32 = 0;
const SCALAR_SIZE: usize = 32;

#[derive(Encode, Decode)]
struct EcdsaPublicKey {
    version: u32,
    /// Uncompressed SEC1 point.
    public_key: Vec<u8>,
}

#[derive(Encode, Decode, Zeroize, ZeroizeOnDrop)]
struct EcdsaPrivateKey {
    #[zeroize(skip)]
    version: u32,
    #[zeroize(skip)]
    public_key: Vec<u8>,
    key_value: Vec<u8>,
}

fn invalid_private_key() -> Error {
    FormatError::InvalidKeyMaterial(ECDSA_PRIVATE_KEY_TYPE_URL.to_string()).into()
}

fn invalid_public_key() -> Error {
    FormatError::InvalidKeyMaterial(ECDSA_PUBLIC_KEY_TYPE_URL.to_string()).into()
}

fn generate_signing_key() -> Result<SigningKey> {
    // A random scalar is rejected only if it is zero or not below the group order.
    loop {
        let bytes = Zeroizing::new(common::random_bytes(SCALAR_SIZE)?);
        if let Ok(signing_key) = SigningKey::from_slice(&bytes) {
            return Ok(signing_key);
        }
    }
}

fn encode_public_key(verifying_key: &VerifyingKey) -> Vec<u8> {
    verifying_key.to_encoded_point(false).as_bytes().to_vec()
}

fn decode_private_key(key_data: &KeyData) -> Result<SigningKey> {
    let key: EcdsaPrivateKey =
        common::decode_from_slice(key_data.value()).map_err(|_| invalid_private_key())?;
    if key.version != VERSION {
        return Err(invalid_private_key());
    }
    let signing_key = SigningKey::from_slice(&key.key_value).map_err(|_| invalid_private_key())?;
    if encode_public_key(signing_key.verifying_key()) != key.public_key {
        return Err(invalid_private_key());
    }
    Ok(signing_key)
}

struct EcdsaSigner {
    signing_key: SigningKey,
}

impl Signer for EcdsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self.signing_key.sign(data);
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

struct EcdsaVerifier {
    verifying_key: VerifyingKey,
}

impl Verifier for EcdsaVerifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        let signature =
            Signature::from_der(signature).map_err(|_| FormatError::InvalidSignature)?;
        self.verifying_key
            .verify(data, &signature)
            .map_err(|_| Error::Crypto(CryptoError::InvalidSignature))
    }
}

/// Manager of ECDSA P-256 private keys; produces [`Signer`]s.
///
/// ECDSA P-256 私钥管理器；产生 [`Signer`]。
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaP256PrivateKeyManager;

impl KeyFactory for EcdsaP256PrivateKeyManager {
    fn type_url(&self) -> &str {
        ECDSA_PRIVATE_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        if !template.value.is_empty() {
            return Err(
                FormatError::InvalidKeyFormat(ECDSA_PRIVATE_KEY_TYPE_URL.to_string()).into(),
            );
        }
        let signing_key = generate_signing_key()?;
        let key = EcdsaPrivateKey {
            version: VERSION,
            public_key: encode_public_key(signing_key.verifying_key()),
            key_value: signing_key.to_bytes().to_vec(),
        };
        Ok(KeyData::new(
            ECDSA_PRIVATE_KEY_TYPE_URL,
            common::encode_to_vec(&key)?,
            KeyMaterialType::AsymmetricPrivate,
        ))
    }

    fn public_key_data(&self, private_key_data: &KeyData) -> Result<KeyData> {
        let signing_key = decode_private_key(private_key_data)?;
        let key = EcdsaPublicKey {
            version: VERSION,
            public_key: encode_public_key(signing_key.verifying_key()),
        };
        Ok(KeyData::new(
            ECDSA_PUBLIC_KEY_TYPE_URL,
            common::encode_to_vec(&key)?,
            KeyMaterialType::AsymmetricPublic,
        ))
    }
}

impl KeyManager for EcdsaP256PrivateKeyManager {
    type Primitive = dyn Signer;

    fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Signer>> {
        Ok(Box::new(EcdsaSigner {
            signing_key: decode_private_key(key_data)?,
        }))
    }
}

/// Manager of ECDSA P-256 public keys; produces [`Verifier`]s.
///
/// Public keys are derived from private keys, never generated.
///
/// ECDSA P-256 公钥管理器；产生 [`Verifier`]。公钥由私钥派生，从不单独生成。
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaP256PublicKeyManager;

impl KeyFactory for EcdsaP256PublicKeyManager {
    fn type_url(&self) -> &str {
        ECDSA_PUBLIC_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPublic
    }

    fn new_key_data(&self, _template: &KeyTemplate) -> Result<KeyData> {
        Err(FormatError::InvalidKeyFormat(ECDSA_PUBLIC_KEY_TYPE_URL.to_string()).into())
    }
}

impl KeyManager for EcdsaP256PublicKeyManager {
    type Primitive = dyn Verifier;

    fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Verifier>> {
        let key: EcdsaPublicKey =
            common::decode_from_slice(key_data.value()).map_err(|_| invalid_public_key())?;
        if key.version != VERSION {
            return Err(invalid_public_key());
        }
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&key.public_key).map_err(|_| invalid_public_key())?;
        Ok(Box::new(EcdsaVerifier { verifying_key }))
    }
}
