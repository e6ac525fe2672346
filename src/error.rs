use rand::rand_core::OsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BincodeError {
    #[error("Encode error: {0}")]
    Enc(#[source] Box<bincode::error::EncodeError>),
    #[error("Decode error: {0}")]
    Dec(#[source] Box<bincode::error::DecodeError>),
}

impl From<bincode::error::EncodeError> for BincodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BincodeError::Enc(Box::from(err))
    }
}

impl From<bincode::error::DecodeError> for BincodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BincodeError::Dec(Box::from(err))
    }
}

/// Errors caused by malformed key material, key formats or ciphertexts.
///
/// 由格式错误的密钥材料、密钥格式或密文引起的错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid key format for {0}")]
    InvalidKeyFormat(String),

    #[error("Invalid key material for {0}")]
    InvalidKeyMaterial(String),

    #[error("Ciphertext is too short or malformed")]
    InvalidCiphertext,

    #[error("Signature is too short or malformed")]
    InvalidSignature,
}

/// Errors reported by the underlying cryptographic operations.
///
/// 底层密码学操作报告的错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: data may have been tampered with or the key does not match")]
    DecryptionFailed,

    #[error("Keyset decryption failed")]
    KeysetDecryptionFailed,

    #[error("MAC verification failed")]
    InvalidMac,

    #[error("Signature verification failed")]
    InvalidSignature,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid keyset: {0}")]
    InvalidKeyset(String),

    #[error("No key manager registered for key type {0}")]
    UnsupportedKeyType(String),

    #[error("Key type {type_url} provides primitive {registered}, not the requested {requested}")]
    WrongPrimitiveType {
        type_url: String,
        requested: &'static str,
        registered: &'static str,
    },

    #[error("A different implementation is already registered for {0}")]
    DuplicateRegistration(String),

    #[error("No primitive wrapper registered for {0}")]
    NoWrapperRegistered(&'static str),

    #[error("No key in the keyset matched the input")]
    NoMatchingKey,

    #[error("Keyset contains secret key material")]
    SecretKeyMaterialPresent,

    #[error("Key of type {0} is not a private key")]
    NotAPrivateKeyset(String),

    #[error("OS-level random number generation failed: {0}")]
    OsRngError(#[from] OsError),

    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    BincodeError(#[from] BincodeError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<bincode::error::EncodeError> for Error {
    fn from(err: bincode::error::EncodeError) -> Self {
        Error::from(BincodeError::Enc(Box::from(err)))
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(err: bincode::error::DecodeError) -> Self {
        Error::from(BincodeError::Dec(Box::from(err)))
    }
}

// 定义一个统一的 Result 类型
pub type Result<T> = std::result::Result<T, Error>;
