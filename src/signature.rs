//! Digital signatures: the [`Signer`] and [`Verifier`] interfaces, ECDSA
//! P-256 key managers and the wrappers that compose them over a keyset.
//!
//! 数字签名：[`Signer`] 和 [`Verifier`] 接口、ECDSA P-256 密钥管理器，
//! 以及在密钥集上组合它们的包装器。
use crate::error::{Error, Result};
use crate::keyset::{KeyTemplate, OutputPrefixType};
use crate::primitive_set::PrimitiveSet;
use crate::registry::{Configuration, PrimitiveWrapper, Registry, RegistryImpl};
use tracing::warn;

mod ecdsa;

pub use ecdsa::{
    EcdsaP256PrivateKeyManager, EcdsaP256PublicKeyManager, ECDSA_PRIVATE_KEY_TYPE_URL,
    ECDSA_PUBLIC_KEY_TYPE_URL,
};

/// Produces signatures with a private key.
///
/// 使用私钥生成签名。
pub trait Signer: Send + Sync {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Checks signatures with a public key.
///
/// 使用公钥检查签名。
pub trait Verifier: Send + Sync {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()>;
}

fn signed_data(output_prefix_type: OutputPrefixType, data: &[u8]) -> Vec<u8> {
    let mut input = data.to_vec();
    if output_prefix_type == OutputPrefixType::Legacy {
        input.push(0x00);
    }
    input
}

/// Signs with the primary key and prefixes the signature with its output prefix.
///
/// 使用主密钥签名，并在签名前加上其输出前缀。
#[derive(Clone, Copy, Debug, Default)]
pub struct SignerWrapper;

struct WrappedSigner {
    primitive_set: PrimitiveSet<dyn Signer>,
}

impl PrimitiveWrapper for SignerWrapper {
    type Primitive = dyn Signer;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Signer>) -> Result<Box<dyn Signer>> {
        Ok(Box::new(WrappedSigner { primitive_set }))
    }
}

impl Signer for WrappedSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let primary = self.primitive_set.primary();
        let signature = primary
            .primitive()
            .sign(&signed_data(primary.output_prefix_type(), data))?;
        let mut output = primary.output_prefix().to_vec();
        output.extend_from_slice(&signature);
        Ok(output)
    }
}

/// Verifies against every candidate key for the signature's prefix, then
/// every raw key.
///
/// 针对与签名前缀匹配的每个候选密钥进行验证，然后是每个原始密钥。
#[derive(Clone, Copy, Debug, Default)]
pub struct VerifierWrapper;

struct WrappedVerifier {
    primitive_set: PrimitiveSet<dyn Verifier>,
}

impl PrimitiveWrapper for VerifierWrapper {
    type Primitive = dyn Verifier;

    fn wrap(&self, primitive_set: PrimitiveSet<dyn Verifier>) -> Result<Box<dyn Verifier>> {
        Ok(Box::new(WrappedVerifier { primitive_set }))
    }
}

impl Verifier for WrappedVerifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        for (entry, candidate) in self.primitive_set.candidates(signature) {
            let input = signed_data(entry.output_prefix_type(), data);
            if entry.primitive().verify(candidate, &input).is_ok() {
                return Ok(());
            }
        }
        warn!(
            candidates = self.primitive_set.len(),
            "no key in the keyset could verify the signature"
        );
        Err(Error::NoMatchingKey)
    }
}

pub(crate) fn install(registry: &mut RegistryImpl) -> Result<()> {
    registry.register_key_manager(EcdsaP256PrivateKeyManager)?;
    registry.register_key_manager(EcdsaP256PublicKeyManager)?;
    registry.register_primitive_wrapper(SignerWrapper)?;
    registry.register_primitive_wrapper(VerifierWrapper)
}

/// Registers the signature key managers and wrappers in the global registry.
pub fn register() -> Result<()> {
    install(&mut Registry::write())
}

pub fn register_in(config: &mut Configuration) -> Result<()> {
    install(config.registry_mut())
}

/// ECDSA P-256 with SHA-256 and DER signatures, Tink output prefix.
pub fn ecdsa_p256() -> KeyTemplate {
    KeyTemplate::new(ECDSA_PRIVATE_KEY_TYPE_URL, Vec::new(), OutputPrefixType::Tink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::{KeyInfo, KeyStatus};
    use crate::registry::{KeyFactory, KeyManager};

    fn info(key_id: u32, output_prefix_type: OutputPrefixType) -> KeyInfo {
        KeyInfo {
            type_url: ECDSA_PRIVATE_KEY_TYPE_URL.to_string(),
            status: KeyStatus::Enabled,
            key_id,
            output_prefix_type,
        }
    }

    #[test]
    fn test_wrapped_sign_and_verify_with_legacy_prefix() {
        let private = EcdsaP256PrivateKeyManager
            .new_key_data(&ecdsa_p256())
            .unwrap();
        let public = EcdsaP256PrivateKeyManager.public_key_data(&private).unwrap();

        let mut signers = PrimitiveSet::<dyn Signer>::builder();
        signers
            .add_primary_primitive(
                EcdsaP256PrivateKeyManager.primitive(&private).unwrap(),
                info(11, OutputPrefixType::Legacy),
            )
            .unwrap();
        let signer = SignerWrapper.wrap(signers.build().unwrap()).unwrap();

        let mut verifiers = PrimitiveSet::<dyn Verifier>::builder();
        verifiers
            .add_primary_primitive(
                EcdsaP256PublicKeyManager.primitive(&public).unwrap(),
                info(11, OutputPrefixType::Legacy),
            )
            .unwrap();
        let verifier = VerifierWrapper.wrap(verifiers.build().unwrap()).unwrap();

        let signature = signer.sign(b"data").unwrap();
        assert_eq!(&signature[..5], &[0x00, 0, 0, 0, 11]);
        verifier.verify(&signature, b"data").unwrap();
        assert!(matches!(
            verifier.verify(&signature, b"changed"),
            Err(Error::NoMatchingKey)
        ));
        assert!(matches!(
            verifier.verify(&signature[5..], b"data"),
            Err(Error::NoMatchingKey)
        ));
    }
}
