//! Shared helpers: the bincode codec configuration and the OS random source.
//!
//! 共享工具：bincode 编解码配置与操作系统随机源。

use crate::error::{Error, Result};
use bincode::{Decode, Encode};
use rand::{rngs::OsRng, TryRngCore};

/// Encodes a value with the crate-wide bincode configuration.
pub(crate) fn encode_to_vec<T: Encode>(value: &T) -> Result<Vec<u8>> {
    static CONFIG: bincode::config::Configuration = bincode::config::standard();
    bincode::encode_to_vec(value, CONFIG).map_err(Error::from)
}

/// Upper bound on the memory a single decode may claim.
///
/// Length prefixes are checked against it before anything is allocated, so a
/// forged prefix fails with a decode error instead of a huge allocation.
///
/// 单次解码可申请内存的上限。长度前缀在分配之前即按此检查。
pub(crate) const MAX_DECODED_SIZE: usize = 4 << 20;

/// Decodes a value with the crate-wide bincode configuration, bounded by
/// [`MAX_DECODED_SIZE`].
///
/// Trailing bytes after the encoded value are rejected.
pub(crate) fn decode_from_slice<T: Decode<()>>(data: &[u8]) -> Result<T> {
    let config = bincode::config::standard().with_limit::<MAX_DECODED_SIZE>();
    let (value, read) = bincode::decode_from_slice(data, config)?;
    if read != data.len() {
        return Err(Error::from(
            bincode::error::DecodeError::OtherString(format!(
                "{} trailing bytes after encoded value",
                data.len() - read
            )),
        ));
    }
    Ok(value)
}

/// Fills a fresh buffer of `len` bytes from the OS CSPRNG.
pub(crate) fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn random_u32() -> Result<u32> {
    Ok(OsRng.try_next_u32()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Encode, Decode)]
    struct Sample {
        id: u32,
        name: String,
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let sample = Sample {
            id: 7,
            name: "sample".to_string(),
        };
        let mut encoded = encode_to_vec(&sample).unwrap();
        let decoded: Sample = decode_from_slice(&encoded).unwrap();
        assert_eq!(decoded, sample);

        encoded.push(0);
        assert!(decode_from_slice::<Sample>(&encoded).is_err());
    }

    #[test]
    fn test_forged_length_prefix_is_rejected() {
        // id 7, then a string length of u64::MAX.
        let mut forged = vec![7u8, 0xFD];
        forged.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            decode_from_slice::<Sample>(&forged),
            Err(Error::BincodeError(_))
        ));

        // A length just past the bound, with no bytes behind it.
        let mut oversized = vec![7u8, 0xFC];
        oversized.extend_from_slice(&(MAX_DECODED_SIZE as u32 + 1).to_le_bytes());
        assert!(decode_from_slice::<Sample>(&oversized).is_err());
    }

    #[test]
    fn test_random_bytes_are_unique() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b, "Random buffers should differ");
    }
}
