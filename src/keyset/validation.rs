//! Structural checks over a [`Keyset`]. All functions are pure.
//!
//! 对 [`Keyset`] 的结构检查。所有函数都是纯函数。
use super::{KeyEntry, KeyStatus, Keyset, OutputPrefixType};
use crate::error::{Error, Result};

fn is_printable(type_url: &str) -> bool {
    !type_url.is_empty() && type_url.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// Checks a single key: printable type URL, recognized status and output prefix.
///
/// 检查单个密钥：可打印的类型 URL、可识别的状态和输出前缀。
pub fn validate_key(key: &KeyEntry) -> Result<()> {
    if !is_printable(key.key_data.type_url()) {
        return Err(Error::InvalidKeyset(format!(
            "key {} has an empty or non-printable type URL",
            key.key_id
        )));
    }
    if key.status == KeyStatus::Unknown {
        return Err(Error::InvalidKeyset(format!(
            "key {} has unknown status",
            key.key_id
        )));
    }
    if key.output_prefix_type == OutputPrefixType::Unknown {
        return Err(Error::InvalidKeyset(format!(
            "key {} has unknown output prefix type",
            key.key_id
        )));
    }
    Ok(())
}

/// Checks the key at `index`.
///
/// 检查位于 `index` 的密钥。
pub fn validate_key_at(keyset: &Keyset, index: usize) -> Result<()> {
    let key = keyset.keys.get(index).ok_or_else(|| {
        Error::InvalidKeyset(format!(
            "index {index} out of range for keyset of size {}",
            keyset.keys.len()
        ))
    })?;
    validate_key(key)
}

/// Checks every key and requires exactly one enabled key whose id equals
/// `primary_key_id`.
///
/// 检查每个密钥，并要求恰好有一个已启用且 ID 等于 `primary_key_id` 的密钥。
pub fn validate_keyset(keyset: &Keyset) -> Result<()> {
    if keyset.keys.is_empty() {
        return Err(Error::InvalidKeyset(
            "keyset must contain at least one key".to_string(),
        ));
    }

    let mut enabled = 0usize;
    let mut primaries = 0usize;
    for index in 0..keyset.keys.len() {
        validate_key_at(keyset, index)?;
        let key = &keyset.keys[index];
        if key.status == KeyStatus::Enabled {
            enabled += 1;
            if key.key_id == keyset.primary_key_id {
                primaries += 1;
            }
        }
    }

    if enabled == 0 {
        return Err(Error::InvalidKeyset(
            "keyset must contain at least one ENABLED key".to_string(),
        ));
    }
    match primaries {
        1 => Ok(()),
        0 => Err(Error::InvalidKeyset(format!(
            "keyset has no enabled primary key with id {}",
            keyset.primary_key_id
        ))),
        n => Err(Error::InvalidKeyset(format!(
            "keyset has {n} enabled keys with primary id {}",
            keyset.primary_key_id
        ))),
    }
}

/// Fails with [`Error::SecretKeyMaterialPresent`] if any key carries secret material.
///
/// 如果任何密钥携带秘密材料，则以 [`Error::SecretKeyMaterialPresent`] 失败。
pub fn validate_no_secret(keyset: &Keyset) -> Result<()> {
    match keyset
        .keys
        .iter()
        .find(|key| key.key_data.key_material_type().is_secret())
    {
        Some(_) => Err(Error::SecretKeyMaterialPresent),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::{KeyData, KeyMaterialType};

    fn key(key_id: u32, status: KeyStatus, type_url: &str) -> KeyEntry {
        KeyEntry {
            key_data: KeyData::new(type_url, vec![1; 16], KeyMaterialType::Symmetric),
            status,
            key_id,
            output_prefix_type: OutputPrefixType::Tink,
        }
    }

    fn keyset(primary_key_id: u32, keys: Vec<KeyEntry>) -> Keyset {
        Keyset {
            primary_key_id,
            keys,
        }
    }

    #[test]
    fn test_single_enabled_primary_is_valid() {
        let ks = keyset(1, vec![key(1, KeyStatus::Enabled, "test.Key")]);
        assert!(validate_keyset(&ks).is_ok());
    }

    #[test]
    fn test_secondary_keys_are_valid() {
        let ks = keyset(
            1,
            vec![
                key(1, KeyStatus::Enabled, "test.Key"),
                key(2, KeyStatus::Enabled, "test.Key"),
                key(3, KeyStatus::Disabled, "test.Key"),
                key(4, KeyStatus::Destroyed, "test.Key"),
            ],
        );
        assert!(validate_keyset(&ks).is_ok());
    }

    #[test]
    fn test_empty_keyset_is_invalid() {
        let ks = keyset(1, vec![]);
        assert!(matches!(validate_keyset(&ks), Err(Error::InvalidKeyset(_))));
    }

    #[test]
    fn test_no_enabled_key_is_invalid() {
        let ks = keyset(
            1,
            vec![
                key(1, KeyStatus::Disabled, "test.Key"),
                key(2, KeyStatus::Destroyed, "test.Key"),
            ],
        );
        assert!(matches!(validate_keyset(&ks), Err(Error::InvalidKeyset(_))));
    }

    #[test]
    fn test_disabled_primary_is_invalid() {
        let ks = keyset(
            1,
            vec![
                key(1, KeyStatus::Disabled, "test.Key"),
                key(2, KeyStatus::Enabled, "test.Key"),
            ],
        );
        assert!(matches!(validate_keyset(&ks), Err(Error::InvalidKeyset(_))));
    }

    #[test]
    fn test_duplicate_primary_is_invalid() {
        let ks = keyset(
            1,
            vec![
                key(1, KeyStatus::Enabled, "test.Key"),
                key(1, KeyStatus::Enabled, "test.Key"),
            ],
        );
        assert!(matches!(validate_keyset(&ks), Err(Error::InvalidKeyset(_))));
    }

    #[test]
    fn test_duplicate_id_with_disabled_copy_is_tolerated() {
        let ks = keyset(
            1,
            vec![
                key(1, KeyStatus::Enabled, "test.Key"),
                key(1, KeyStatus::Disabled, "test.Key"),
            ],
        );
        assert!(validate_keyset(&ks).is_ok());
    }

    #[test]
    fn test_validate_key_at() {
        let ks = keyset(
            1,
            vec![
                key(1, KeyStatus::Enabled, "test.Key"),
                key(2, KeyStatus::Unknown, "test.Key"),
                key(3, KeyStatus::Enabled, ""),
                key(4, KeyStatus::Enabled, "test\u{7}Key"),
            ],
        );
        assert!(validate_key_at(&ks, 0).is_ok());
        assert!(validate_key_at(&ks, 1).is_err());
        assert!(validate_key_at(&ks, 2).is_err());
        assert!(validate_key_at(&ks, 3).is_err());
        assert!(validate_key_at(&ks, 4).is_err());
        assert!(validate_keyset(&ks).is_err());
    }

    #[test]
    fn test_unknown_prefix_is_invalid() {
        let mut k = key(1, KeyStatus::Enabled, "test.Key");
        k.output_prefix_type = OutputPrefixType::Unknown;
        assert!(validate_key(&k).is_err());
    }

    #[test]
    fn test_no_secret() {
        let mut public = key(1, KeyStatus::Enabled, "test.PublicKey");
        public.key_data = KeyData::new("test.PublicKey", vec![4; 65], KeyMaterialType::AsymmetricPublic);
        let ks = keyset(1, vec![public.clone()]);
        assert!(validate_no_secret(&ks).is_ok());

        let ks = keyset(1, vec![public, key(2, KeyStatus::Disabled, "test.Key")]);
        assert!(matches!(
            validate_no_secret(&ks),
            Err(Error::SecretKeyMaterialPresent)
        ));
    }
}
