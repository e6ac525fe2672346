//! Transport abstractions for persisted keysets.
//!
//! [`KeysetReader`] and [`KeysetWriter`] move cleartext or encrypted keysets
//! in and out of the process. [`BinaryKeysetReader`] and
//! [`BinaryKeysetWriter`] use the crate's bincode encoding over any
//! `std::io` stream.
//!
//! 持久化密钥集的传输抽象。
use super::{EncryptedKeyset, Keyset};
use crate::error::Result;
use std::io::{Read, Write};
use zeroize::Zeroizing;

/// A source of serialized keysets.
///
/// 序列化密钥集的来源。
pub trait KeysetReader {
    /// Reads a cleartext keyset.
    fn read(&mut self) -> Result<Keyset>;

    /// Reads an encrypted keyset.
    fn read_encrypted(&mut self) -> Result<EncryptedKeyset>;
}

/// A sink for serialized keysets.
///
/// 序列化密钥集的目标。
pub trait KeysetWriter {
    /// Writes a cleartext keyset.
    fn write(&mut self, keyset: &Keyset) -> Result<()>;

    /// Writes an encrypted keyset.
    fn write_encrypted(&mut self, encrypted_keyset: &EncryptedKeyset) -> Result<()>;
}

/// Reads bincode-encoded keysets from a synchronous reader.
///
/// The whole source is consumed on the first read.
pub struct BinaryKeysetReader<R> {
    source: R,
}

impl<R: Read> BinaryKeysetReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    fn read_all(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut bytes = Zeroizing::new(Vec::new());
        self.source.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl<R: Read> KeysetReader for BinaryKeysetReader<R> {
    fn read(&mut self) -> Result<Keyset> {
        let bytes = self.read_all()?;
        Keyset::decode_from_slice(&bytes)
    }

    fn read_encrypted(&mut self) -> Result<EncryptedKeyset> {
        let bytes = self.read_all()?;
        EncryptedKeyset::decode_from_slice(&bytes)
    }
}

/// Writes bincode-encoded keysets to a synchronous writer.
pub struct BinaryKeysetWriter<W> {
    sink: W,
}

impl<W: Write> BinaryKeysetWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Consumes the writer and returns the underlying sink.
    ///
    /// 消耗写入器并返回底层目标。
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> KeysetWriter for BinaryKeysetWriter<W> {
    fn write(&mut self, keyset: &Keyset) -> Result<()> {
        let bytes = Zeroizing::new(keyset.encode_to_vec()?);
        self.sink.write_all(&bytes)?;
        self.sink.flush()?;
        Ok(())
    }

    fn write_encrypted(&mut self, encrypted_keyset: &EncryptedKeyset) -> Result<()> {
        let bytes = encrypted_keyset.encode_to_vec()?;
        self.sink.write_all(&bytes)?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::{KeyData, KeyEntry, KeyMaterialType, KeyStatus, OutputPrefixType};

    fn sample_keyset() -> Keyset {
        Keyset {
            primary_key_id: 9,
            keys: vec![KeyEntry {
                key_data: KeyData::new("test.Key", vec![5; 16], KeyMaterialType::Symmetric),
                status: KeyStatus::Enabled,
                key_id: 9,
                output_prefix_type: OutputPrefixType::Raw,
            }],
        }
    }

    #[test]
    fn test_binary_writer_matches_codec() {
        let keyset = sample_keyset();
        let mut writer = BinaryKeysetWriter::new(Vec::new());
        writer.write(&keyset).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes, keyset.encode_to_vec().unwrap());

        let mut reader = BinaryKeysetReader::new(bytes.as_slice());
        assert_eq!(reader.read().unwrap(), keyset);
    }

    #[test]
    fn test_encrypted_keyset_transport() {
        let encrypted = EncryptedKeyset {
            encrypted_keyset: vec![1, 2, 3, 4],
            keyset_info: Some(sample_keyset().keyset_info()),
        };
        let mut writer = BinaryKeysetWriter::new(Vec::new());
        writer.write_encrypted(&encrypted).unwrap();
        let bytes = writer.into_inner();

        let mut reader = BinaryKeysetReader::new(bytes.as_slice());
        assert_eq!(reader.read_encrypted().unwrap(), encrypted);
    }

    #[test]
    fn test_truncated_input_fails() {
        let bytes = sample_keyset().encode_to_vec().unwrap();
        let mut reader = BinaryKeysetReader::new(&bytes[..bytes.len() / 2]);
        assert!(reader.read().is_err());
    }
}
