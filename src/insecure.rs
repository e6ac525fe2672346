//! Cleartext access to keysets, secret material included.
//!
//! Anything read or written through this module bypasses the encryption
//! that [`KeysetHandle::write`] applies. Use it for tests, for key import
//! from trusted storage, or where the keyset is protected by other means.
//!
//! 对密钥集的明文访问，包括秘密材料。
//!
//! 通过此模块读写的任何内容都会绕过 [`KeysetHandle::write`] 所施加的加密。
//! 仅在测试、从可信存储导入密钥或密钥集已通过其他方式保护时使用。
use crate::error::{Error, Result};
use crate::keyset::io::{KeysetReader, KeysetWriter};
use crate::keyset::{Keyset, MonitoringAnnotations};
use crate::keyset_handle::KeysetHandle;

/// Reads a cleartext keyset.
///
/// 读取明文密钥集。
pub fn read<R>(reader: &mut R, annotations: MonitoringAnnotations) -> Result<KeysetHandle>
where
    R: KeysetReader + ?Sized,
{
    from_keyset(reader.read()?, annotations)
}

/// Writes the keyset in cleartext.
///
/// 以明文写出密钥集。
pub fn write<W>(handle: &KeysetHandle, writer: &mut W) -> Result<()>
where
    W: KeysetWriter + ?Sized,
{
    writer.write(handle.keyset())
}

/// Wraps an existing keyset in a handle.
///
/// 将现有密钥集包装在句柄中。
pub fn from_keyset(keyset: Keyset, annotations: MonitoringAnnotations) -> Result<KeysetHandle> {
    if keyset.keys.is_empty() {
        return Err(Error::InvalidKeyset("keyset is empty".to_string()));
    }
    Ok(KeysetHandle::from_keyset(keyset, annotations))
}

/// Returns the keyset held by `handle`.
pub fn keyset(handle: &KeysetHandle) -> &Keyset {
    handle.keyset()
}

/// Consumes `handle` and returns its keyset.
pub fn into_keyset(handle: KeysetHandle) -> Keyset {
    handle.into_keyset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::io::{BinaryKeysetReader, BinaryKeysetWriter};
    use crate::keyset::{KeyData, KeyEntry, KeyMaterialType, KeyStatus, OutputPrefixType};

    fn secret_keyset() -> Keyset {
        Keyset {
            primary_key_id: 3,
            keys: vec![KeyEntry {
                key_data: KeyData::new("test.Key", vec![7; 32], KeyMaterialType::Symmetric),
                status: KeyStatus::Enabled,
                key_id: 3,
                output_prefix_type: OutputPrefixType::Tink,
            }],
        }
    }

    #[test]
    fn test_cleartext_round_trip_keeps_material() {
        let handle = from_keyset(secret_keyset(), MonitoringAnnotations::new()).unwrap();
        let mut writer = BinaryKeysetWriter::new(Vec::new());
        write(&handle, &mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut reader = BinaryKeysetReader::new(bytes.as_slice());
        let restored = read(&mut reader, MonitoringAnnotations::new()).unwrap();
        assert_eq!(keyset(&restored), &secret_keyset());
        assert_eq!(into_keyset(restored), secret_keyset());
    }

    #[test]
    fn test_empty_keyset_is_rejected() {
        assert!(from_keyset(Keyset::default(), MonitoringAnnotations::new()).is_err());
    }
}
