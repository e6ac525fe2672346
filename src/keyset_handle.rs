//! [`KeysetHandle`]: the owner of a keyset and the only way to turn it into
//! a usable primitive.
//!
//! The handle never hands out key material. Callers see keys through the
//! material-free [`Entry`] and [`Key`] views, obtain composite primitives
//! through [`KeysetHandle::primitive`] and its variants, and persist the
//! keyset through the [`KeysetWriter`] operations, which either encrypt it
//! under a master [`Aead`] or refuse to write secret material.
//!
//! [`KeysetHandle`]：密钥集的所有者，也是将其转换为可用原语的唯一途径。
//!
//! 句柄从不交出密钥材料。调用方通过不含材料的 [`Entry`] 和 [`Key`] 视图查看密钥，
//! 通过 [`KeysetHandle::primitive`] 及其变体获取复合原语，并通过 [`KeysetWriter`]
//! 操作持久化密钥集：要么在主 [`Aead`] 下加密，要么拒绝写出秘密材料。
use crate::aead::Aead;
use crate::common;
use crate::error::{CryptoError, Error, Result};
use crate::keyset::io::{KeysetReader, KeysetWriter};
use crate::keyset::validation::{validate_key_at, validate_keyset, validate_no_secret};
use crate::keyset::{
    EncryptedKeyset, KeyEntry, KeyMaterialType, KeyStatus, KeyTemplate, Keyset, KeysetInfo,
    MonitoringAnnotations, OutputPrefixType,
};
use crate::primitive_set::PrimitiveSet;
use crate::registry::{Configuration, GlobalResolver, KeyManager, Resolver};
use tracing::debug;
use zeroize::Zeroizing;

/// A material-free description of a key.
///
/// 不含材料的密钥描述。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    type_url: String,
    output_prefix_type: OutputPrefixType,
    key_material_type: KeyMaterialType,
    id_requirement: Option<u32>,
}

impl Key {
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn output_prefix_type(&self) -> OutputPrefixType {
        self.output_prefix_type
    }

    pub fn key_material_type(&self) -> KeyMaterialType {
        self.key_material_type
    }

    /// The key id embedded in this key's output, or `None` for raw keys.
    ///
    /// 嵌入在此密钥输出中的密钥 ID；原始密钥为 `None`。
    pub fn id_requirement(&self) -> Option<u32> {
        self.id_requirement
    }

    pub fn has_secret(&self) -> bool {
        self.key_material_type.is_secret()
    }
}

/// One key of a handle, as seen from outside.
///
/// 从外部看到的句柄中的一个密钥。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    key: Key,
    status: KeyStatus,
    id: u32,
    is_primary: bool,
}

impl Entry {
    fn new(key: &KeyEntry, primary_key_id: u32) -> Self {
        let id_requirement = match key.output_prefix_type {
            OutputPrefixType::Raw => None,
            _ => Some(key.key_id),
        };
        Self {
            key: Key {
                type_url: key.key_data.type_url().to_string(),
                output_prefix_type: key.output_prefix_type,
                key_material_type: key.key_data.key_material_type(),
                id_requirement,
            },
            status: key.status,
            id: key.key_id,
            is_primary: key.status == KeyStatus::Enabled && key.key_id == primary_key_id,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn status(&self) -> KeyStatus {
        self.status
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }
}

/// Owns a keyset and its monitoring annotations.
///
/// 拥有一个密钥集及其监控注解。
#[derive(Clone, Debug)]
pub struct KeysetHandle {
    keyset: Keyset,
    annotations: MonitoringAnnotations,
}

impl KeysetHandle {
    pub(crate) fn from_keyset(keyset: Keyset, annotations: MonitoringAnnotations) -> Self {
        Self {
            keyset,
            annotations,
        }
    }

    pub(crate) fn keyset(&self) -> &Keyset {
        &self.keyset
    }

    pub(crate) fn keyset_mut(&mut self) -> &mut Keyset {
        &mut self.keyset
    }

    pub(crate) fn into_keyset(self) -> Keyset {
        self.keyset
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Creates a handle holding one new primary key generated from `template`
    /// by the global registry.
    ///
    /// 创建一个句柄，其中包含一个由全局注册表根据 `template` 生成的新主密钥。
    pub fn generate_new(
        template: &KeyTemplate,
        annotations: MonitoringAnnotations,
    ) -> Result<Self> {
        Self::generate_new_in(&GlobalResolver, template, annotations)
    }

    /// Like [`KeysetHandle::generate_new`], resolving the key type in `config`.
    pub fn generate_new_with_config(
        template: &KeyTemplate,
        config: &Configuration,
        annotations: MonitoringAnnotations,
    ) -> Result<Self> {
        Self::generate_new_in(config.registry(), template, annotations)
    }

    fn generate_new_in<R: Resolver>(
        registry: &R,
        template: &KeyTemplate,
        annotations: MonitoringAnnotations,
    ) -> Result<Self> {
        let mut handle = Self::from_keyset(Keyset::default(), annotations);
        handle.add_key_in(registry, template, true)?;
        Ok(handle)
    }

    /// Reads an encrypted keyset and decrypts it with `master_aead`.
    ///
    /// 读取加密的密钥集并使用 `master_aead` 解密。
    pub fn read<R>(
        reader: &mut R,
        master_aead: &dyn Aead,
        annotations: MonitoringAnnotations,
    ) -> Result<Self>
    where
        R: KeysetReader + ?Sized,
    {
        Self::read_with_associated_data(reader, master_aead, &[], annotations)
    }

    /// Reads an encrypted keyset that was bound to `associated_data`.
    ///
    /// 读取绑定到 `associated_data` 的加密密钥集。
    pub fn read_with_associated_data<R>(
        reader: &mut R,
        master_aead: &dyn Aead,
        associated_data: &[u8],
        annotations: MonitoringAnnotations,
    ) -> Result<Self>
    where
        R: KeysetReader + ?Sized,
    {
        let encrypted = reader.read_encrypted()?;
        let keyset = decrypt(&encrypted, master_aead, associated_data)?;
        debug!(keys = keyset.keys.len(), "read encrypted keyset");
        Ok(Self::from_keyset(keyset, annotations))
    }

    /// Reads a cleartext keyset that must not contain secret key material.
    ///
    /// Fails with [`Error::SecretKeyMaterialPresent`] otherwise.
    ///
    /// 读取不得包含秘密密钥材料的明文密钥集，否则以
    /// [`Error::SecretKeyMaterialPresent`] 失败。
    pub fn read_no_secret(
        serialized_keyset: &[u8],
        annotations: MonitoringAnnotations,
    ) -> Result<Self> {
        let keyset = Keyset::decode_from_slice(serialized_keyset)?;
        ensure_not_empty(&keyset)?;
        validate_no_secret(&keyset)?;
        debug!(keys = keyset.keys.len(), "read public keyset");
        Ok(Self::from_keyset(keyset, annotations))
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Encrypts the keyset with `master_aead` and writes it.
    ///
    /// 使用 `master_aead` 加密密钥集并写出。
    pub fn write<W>(&self, writer: &mut W, master_aead: &dyn Aead) -> Result<()>
    where
        W: KeysetWriter + ?Sized,
    {
        self.write_with_associated_data(writer, master_aead, &[])
    }

    pub fn write_with_associated_data<W>(
        &self,
        writer: &mut W,
        master_aead: &dyn Aead,
        associated_data: &[u8],
    ) -> Result<()>
    where
        W: KeysetWriter + ?Sized,
    {
        let encrypted = encrypt(&self.keyset, master_aead, associated_data)?;
        writer.write_encrypted(&encrypted)?;
        debug!(keys = self.keyset.keys.len(), "wrote encrypted keyset");
        Ok(())
    }

    /// Writes the keyset in cleartext. Nothing is written if any key carries
    /// secret material.
    ///
    /// 以明文写出密钥集。如果任何密钥携带秘密材料，则不写出任何内容。
    pub fn write_no_secret<W>(&self, writer: &mut W) -> Result<()>
    where
        W: KeysetWriter + ?Sized,
    {
        validate_no_secret(&self.keyset)?;
        writer.write(&self.keyset)?;
        debug!(keys = self.keyset.keys.len(), "wrote public keyset");
        Ok(())
    }

    /// Returns the material-free metadata of the keyset.
    ///
    /// 返回密钥集不含材料的元数据。
    pub fn keyset_info(&self) -> KeysetInfo {
        self.keyset.keyset_info()
    }

    pub fn annotations(&self) -> &MonitoringAnnotations {
        &self.annotations
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    /// Number of keys, whatever their status.
    pub fn size(&self) -> usize {
        self.keyset.keys.len()
    }

    pub fn validate_at(&self, index: usize) -> Result<()> {
        validate_key_at(&self.keyset, index)
    }

    /// Validates every key and checks there is a single enabled primary.
    ///
    /// 验证每个密钥并检查是否存在单个已启用的主密钥。
    pub fn validate(&self) -> Result<()> {
        validate_keyset(&self.keyset)
    }

    /// Returns the primary entry.
    ///
    /// # Panics
    ///
    /// Panics if [`KeysetHandle::validate`] fails. Use
    /// [`KeysetHandle::try_primary`] when the keyset is not known to be valid.
    ///
    /// 返回主条目。如果 [`KeysetHandle::validate`] 失败则 panic。
    pub fn primary(&self) -> Entry {
        match self.try_primary() {
            Ok(entry) => entry,
            Err(err) => panic!("keyset handle has no valid primary: {err}"),
        }
    }

    pub fn try_primary(&self) -> Result<Entry> {
        self.validate()?;
        self.keyset
            .keys
            .iter()
            .find(|key| {
                key.status == KeyStatus::Enabled && key.key_id == self.keyset.primary_key_id
            })
            .map(|key| Entry::new(key, self.keyset.primary_key_id))
            .ok_or_else(|| Error::InvalidKeyset("keyset has no primary".to_string()))
    }

    /// Returns the entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if [`KeysetHandle::validate_at`] fails for `index`.
    ///
    /// 返回位于 `index` 的条目。如果 `index` 的 [`KeysetHandle::validate_at`] 失败则 panic。
    pub fn entry(&self, index: usize) -> Entry {
        match self.try_entry(index) {
            Ok(entry) => entry,
            Err(err) => panic!("invalid keyset entry at index {index}: {err}"),
        }
    }

    pub fn try_entry(&self, index: usize) -> Result<Entry> {
        self.validate_at(index)?;
        Ok(Entry::new(
            &self.keyset.keys[index],
            self.keyset.primary_key_id,
        ))
    }

    // ---------------------------------------------------------------------
    // Key addition and derivation
    // ---------------------------------------------------------------------

    /// Generates a key from `template`, appends it as `Enabled` and returns
    /// its id. Existing keys are left untouched.
    ///
    /// 根据 `template` 生成密钥，以 `Enabled` 状态追加并返回其 ID。现有密钥保持不变。
    pub fn add_key(&mut self, template: &KeyTemplate, as_primary: bool) -> Result<u32> {
        self.add_key_in(&GlobalResolver, template, as_primary)
    }

    pub fn add_key_with_config(
        &mut self,
        template: &KeyTemplate,
        config: &Configuration,
        as_primary: bool,
    ) -> Result<u32> {
        self.add_key_in(config.registry(), template, as_primary)
    }

    pub(crate) fn add_key_in<R: Resolver>(
        &mut self,
        registry: &R,
        template: &KeyTemplate,
        as_primary: bool,
    ) -> Result<u32> {
        if template.output_prefix_type == OutputPrefixType::Unknown {
            return Err(Error::InvalidKeyset(format!(
                "template for {} has unknown output prefix type",
                template.type_url
            )));
        }
        let key_data = registry.new_key_data(template)?;
        let key_id = self.unused_key_id()?;
        self.keyset.keys.push(KeyEntry {
            key_data,
            status: KeyStatus::Enabled,
            key_id,
            output_prefix_type: template.output_prefix_type,
        });
        if as_primary {
            self.keyset.primary_key_id = key_id;
        }
        debug!(
            type_url = %template.type_url,
            key_id,
            as_primary,
            "added key"
        );
        Ok(key_id)
    }

    fn unused_key_id(&self) -> Result<u32> {
        loop {
            let candidate = common::random_u32()?;
            if !self.keyset.contains_key_id(candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Derives a handle holding the public counterpart of every key.
    ///
    /// Every key must carry asymmetric private material. A destroyed key has
    /// none left, so the derivation fails with [`Error::InvalidKeyset`]; delete
    /// it through [`KeysetManager`](crate::KeysetManager) first. Entry `i` of
    /// the result describes entry `i` of `self`.
    ///
    /// 派生一个持有每个密钥的公钥对应物的句柄。
    ///
    /// 每个密钥都必须携带非对称私钥材料。已销毁的密钥不再有材料，因此派生以
    /// [`Error::InvalidKeyset`] 失败；请先通过 [`KeysetManager`](crate::KeysetManager) 删除它。
    /// 结果的第 `i` 个条目对应 `self` 的第 `i` 个条目。
    pub fn public_keyset_handle(&self) -> Result<KeysetHandle> {
        self.public_keyset_handle_in(&GlobalResolver)
    }

    pub fn public_keyset_handle_with_config(&self, config: &Configuration) -> Result<KeysetHandle> {
        self.public_keyset_handle_in(config.registry())
    }

    fn public_keyset_handle_in<R: Resolver>(&self, registry: &R) -> Result<KeysetHandle> {
        let mut keys = Vec::with_capacity(self.keyset.keys.len());
        for key in &self.keyset.keys {
            if key.key_data.key_material_type() != KeyMaterialType::AsymmetricPrivate {
                return Err(Error::NotAPrivateKeyset(
                    key.key_data.type_url().to_string(),
                ));
            }
            if key.status == KeyStatus::Destroyed {
                return Err(Error::InvalidKeyset(format!(
                    "key {} is destroyed and has no public key to derive",
                    key.key_id
                )));
            }
            keys.push(KeyEntry {
                key_data: registry.public_key_data(&key.key_data)?,
                status: key.status,
                key_id: key.key_id,
                output_prefix_type: key.output_prefix_type,
            });
        }
        let keyset = Keyset {
            primary_key_id: self.keyset.primary_key_id,
            keys,
        };
        Ok(KeysetHandle::from_keyset(keyset, self.annotations.clone()))
    }

    // ---------------------------------------------------------------------
    // Primitives
    // ---------------------------------------------------------------------

    /// Builds the composite primitive `P` using the global registry.
    ///
    /// 使用全局注册表构建复合原语 `P`。
    pub fn primitive<P>(&self) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        let primitive_set = self.primitive_set_in(&GlobalResolver, None)?;
        GlobalResolver.wrap(primitive_set)
    }

    /// Builds the composite primitive `P` using only `config`.
    ///
    /// 仅使用 `config` 构建复合原语 `P`。
    pub fn primitive_with_config<P>(&self, config: &Configuration) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        let primitive_set = self.primitive_set_in(config.registry(), None)?;
        config.wrap(primitive_set)
    }

    /// Builds the composite primitive `P`, preferring `manager` for every key
    /// type it supports and falling back to the global registry otherwise.
    ///
    /// 构建复合原语 `P`，对 `manager` 支持的每种密钥类型优先使用它，否则回退到全局注册表。
    #[deprecated(note = "register the key manager in a `Configuration` and use `primitive_with_config`")]
    pub fn primitive_with_manager<P>(&self, manager: &dyn KeyManager<Primitive = P>) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        let primitive_set = self.primitive_set_in(&GlobalResolver, Some(manager))?;
        GlobalResolver.wrap(primitive_set)
    }

    /// Resolves every enabled key through the global registry without
    /// composing the result.
    ///
    /// 通过全局注册表解析每个已启用的密钥，但不组合结果。
    pub fn primitive_set<P>(&self) -> Result<PrimitiveSet<P>>
    where
        P: ?Sized + 'static,
    {
        self.primitive_set_in(&GlobalResolver, None)
    }

    pub fn primitive_set_with_config<P>(&self, config: &Configuration) -> Result<PrimitiveSet<P>>
    where
        P: ?Sized + 'static,
    {
        self.primitive_set_in(config.registry(), None)
    }

    fn primitive_set_in<P, R>(
        &self,
        registry: &R,
        custom_manager: Option<&dyn KeyManager<Primitive = P>>,
    ) -> Result<PrimitiveSet<P>>
    where
        P: ?Sized + 'static,
        R: Resolver,
    {
        self.validate()?;
        let mut builder = PrimitiveSet::builder();
        builder.add_annotations(self.annotations.clone());
        for key in &self.keyset.keys {
            if key.status != KeyStatus::Enabled {
                continue;
            }
            let primitive = match custom_manager {
                Some(manager) if manager.does_support(key.key_data.type_url()) => {
                    manager.primitive(&key.key_data)?
                }
                _ => registry.primitive::<P>(&key.key_data)?,
            };
            if key.key_id == self.keyset.primary_key_id {
                builder.add_primary_primitive(primitive, key.key_info())?;
            } else {
                builder.add_primitive(primitive, key.key_info())?;
            }
        }
        let primitive_set = builder.build()?;
        debug!(
            primary_key_id = self.keyset.primary_key_id,
            entries = primitive_set.len(),
            "built primitive set"
        );
        Ok(primitive_set)
    }
}

fn ensure_not_empty(keyset: &Keyset) -> Result<()> {
    if keyset.keys.is_empty() {
        return Err(Error::InvalidKeyset("keyset is empty".to_string()));
    }
    Ok(())
}

fn encrypt(keyset: &Keyset, master_aead: &dyn Aead, associated_data: &[u8]) -> Result<EncryptedKeyset> {
    let serialized = Zeroizing::new(keyset.encode_to_vec()?);
    let encrypted_keyset = master_aead.encrypt(&serialized, associated_data)?;
    Ok(EncryptedKeyset {
        encrypted_keyset,
        keyset_info: Some(keyset.keyset_info()),
    })
}

fn decrypt(
    encrypted: &EncryptedKeyset,
    master_aead: &dyn Aead,
    associated_data: &[u8],
) -> Result<Keyset> {
    if encrypted.encrypted_keyset.is_empty() {
        return Err(Error::InvalidKeyset("encrypted keyset is empty".to_string()));
    }
    let serialized = Zeroizing::new(
        master_aead
            .decrypt(&encrypted.encrypted_keyset, associated_data)
            .map_err(|_| Error::Crypto(CryptoError::KeysetDecryptionFailed))?,
    );
    let keyset = Keyset::decode_from_slice(&serialized)?;
    ensure_not_empty(&keyset)?;
    Ok(keyset)
}
