//! The resolved, not yet composed, primitives of a keyset.
//!
//! A [`PrimitiveSet`] holds one constructed primitive per enabled key, in
//! keyset order, together with the key's [`KeyInfo`] and output prefix.
//! Exactly one entry is the primary. Sets are produced by
//! [`PrimitiveSetBuilder`] and consumed by a
//! [`PrimitiveWrapper`](crate::registry::PrimitiveWrapper).
//!
//! 密钥集中已解析但尚未组合的原语。
//!
//! [`PrimitiveSet`] 按密钥集顺序为每个已启用的密钥保存一个构造好的原语，
//! 以及该密钥的 [`KeyInfo`] 和输出前缀。恰好有一个条目是主条目。
use crate::error::{Error, Result};
use crate::keyset::{KeyInfo, KeyStatus, MonitoringAnnotations, OutputPrefixType};

/// Length of a non-raw output prefix: one start byte plus a big-endian key id.
pub const PREFIX_SIZE: usize = 5;
pub const TINK_START_BYTE: u8 = 0x01;
pub const LEGACY_START_BYTE: u8 = 0x00;

/// Computes the output prefix for a key.
///
/// 计算密钥的输出前缀。
pub fn output_prefix(output_prefix_type: OutputPrefixType, key_id: u32) -> Result<Vec<u8>> {
    let start_byte = match output_prefix_type {
        OutputPrefixType::Tink => TINK_START_BYTE,
        OutputPrefixType::Legacy | OutputPrefixType::Crunchy => LEGACY_START_BYTE,
        OutputPrefixType::Raw => return Ok(Vec::new()),
        OutputPrefixType::Unknown => {
            return Err(Error::InvalidKeyset(format!(
                "key {key_id} has unknown output prefix type"
            )))
        }
    };
    let mut prefix = Vec::with_capacity(PREFIX_SIZE);
    prefix.push(start_byte);
    prefix.extend_from_slice(&key_id.to_be_bytes());
    Ok(prefix)
}

/// One constructed primitive and the key it was built from.
///
/// 一个构造好的原语以及构建它的密钥。
pub struct Entry<P: ?Sized> {
    primitive: Box<P>,
    key_info: KeyInfo,
    output_prefix: Vec<u8>,
}

impl<P: ?Sized> Entry<P> {
    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    pub fn key_info(&self) -> &KeyInfo {
        &self.key_info
    }

    pub fn key_id(&self) -> u32 {
        self.key_info.key_id
    }

    pub fn output_prefix_type(&self) -> OutputPrefixType {
        self.key_info.output_prefix_type
    }

    /// The bytes prepended to output produced with this entry.
    pub fn output_prefix(&self) -> &[u8] {
        &self.output_prefix
    }
}

/// An ordered collection of primitives with exactly one primary.
///
/// 具有恰好一个主条目的有序原语集合。
pub struct PrimitiveSet<P: ?Sized> {
    entries: Vec<Entry<P>>,
    primary: usize,
    annotations: MonitoringAnnotations,
}

impl<P: ?Sized> PrimitiveSet<P> {
    pub fn builder() -> PrimitiveSetBuilder<P> {
        PrimitiveSetBuilder::new()
    }

    /// The entry used for operations that produce new output.
    ///
    /// 用于产生新输出的操作的条目。
    pub fn primary(&self) -> &Entry<P> {
        &self.entries[self.primary]
    }

    /// All entries in keyset order.
    pub fn entries(&self) -> &[Entry<P>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a built set; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn annotations(&self) -> &MonitoringAnnotations {
        &self.annotations
    }

    /// Returns the entries that may have produced `data`, each paired with the
    /// input that entry should see.
    ///
    /// Prefixed entries are candidates only when `data` starts with their
    /// prefix, which is stripped; raw entries always are and see `data`
    /// unchanged. The primary comes first, the rest follow in keyset order.
    ///
    /// 返回可能产生 `data` 的条目，每个条目都与它应该看到的输入配对。
    ///
    /// 带前缀的条目只有在 `data` 以其前缀开头时才是候选项，前缀会被去除；
    /// 原始条目始终是候选项，并看到未更改的 `data`。主条目在前，其余按密钥集顺序排列。
    pub fn candidates<'a>(
        &'a self,
        data: &'a [u8],
    ) -> impl Iterator<Item = (&'a Entry<P>, &'a [u8])> + 'a {
        let primary = self.primary;
        std::iter::once(primary)
            .chain((0..self.entries.len()).filter(move |&index| index != primary))
            .filter_map(move |index| {
                let entry = &self.entries[index];
                if entry.output_prefix.is_empty() {
                    Some((entry, data))
                } else if data.starts_with(&entry.output_prefix) {
                    Some((entry, &data[entry.output_prefix.len()..]))
                } else {
                    None
                }
            })
    }
}

/// Accumulates entries for a [`PrimitiveSet`].
///
/// 为 [`PrimitiveSet`] 累积条目。
pub struct PrimitiveSetBuilder<P: ?Sized> {
    entries: Vec<Entry<P>>,
    primary: Option<usize>,
    annotations: MonitoringAnnotations,
}

impl<P: ?Sized> Default for PrimitiveSetBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized> PrimitiveSetBuilder<P> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            primary: None,
            annotations: MonitoringAnnotations::new(),
        }
    }

    pub fn add_annotations(&mut self, annotations: MonitoringAnnotations) -> &mut Self {
        self.annotations.extend(annotations);
        self
    }

    /// Adds a secondary entry. Only enabled keys are accepted.
    ///
    /// 添加一个次要条目。只接受已启用的密钥。
    pub fn add_primitive(&mut self, primitive: Box<P>, key_info: KeyInfo) -> Result<&mut Self> {
        if key_info.status != KeyStatus::Enabled {
            return Err(Error::InvalidKeyset(format!(
                "key {} is not enabled",
                key_info.key_id
            )));
        }
        let output_prefix = output_prefix(key_info.output_prefix_type, key_info.key_id)?;
        self.entries.push(Entry {
            primitive,
            key_info,
            output_prefix,
        });
        Ok(self)
    }

    /// Adds the primary entry. Fails if a primary was already added.
    ///
    /// 添加主条目。如果已经添加了主条目则失败。
    pub fn add_primary_primitive(
        &mut self,
        primitive: Box<P>,
        key_info: KeyInfo,
    ) -> Result<&mut Self> {
        if let Some(existing) = self.primary {
            return Err(Error::InvalidKeyset(format!(
                "primary already set to key {}, cannot also set key {}",
                self.entries[existing].key_id(),
                key_info.key_id
            )));
        }
        self.add_primitive(primitive, key_info)?;
        self.primary = Some(self.entries.len() - 1);
        Ok(self)
    }

    /// Finishes the set. Fails unless a primary was added.
    ///
    /// 完成集合。除非已添加主条目，否则失败。
    pub fn build(self) -> Result<PrimitiveSet<P>> {
        let primary = self
            .primary
            .ok_or_else(|| Error::InvalidKeyset("primitive set has no primary".to_string()))?;
        Ok(PrimitiveSet {
            entries: self.entries,
            primary,
            annotations: self.annotations,
        })
    }
}
