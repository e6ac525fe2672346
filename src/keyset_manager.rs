//! Key rotation: adding keys and moving them through their lifecycle.
//!
//! 密钥轮换：添加密钥并在其生命周期中移动它们。
use crate::error::{Error, Result};
use crate::keyset::{KeyEntry, KeyStatus, KeyTemplate, Keyset, MonitoringAnnotations};
use crate::keyset_handle::KeysetHandle;
use crate::registry::{Configuration, GlobalResolver, Resolver};
use tracing::debug;

/// Mutable access to a keyset for rotation.
///
/// `enable` and `disable` move a key between `Enabled` and `Disabled`;
/// `destroy` wipes a key's material for good; `delete` removes the entry.
/// None of them may touch the primary key; promote another key with
/// [`KeysetManager::set_primary`] first.
///
/// 用于轮换的密钥集可变访问。
///
/// `enable` 和 `disable` 在 `Enabled` 和 `Disabled` 之间移动密钥；
/// `destroy` 永久擦除密钥材料；`delete` 删除条目。它们都不能作用于主密钥；
/// 请先用 [`KeysetManager::set_primary`] 提升另一个密钥。
#[derive(Debug, Default)]
pub struct KeysetManager {
    handle: Option<KeysetHandle>,
}

impl KeysetManager {
    /// Creates a manager with an empty keyset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager that continues from a copy of `handle`'s keyset.
    ///
    /// 创建一个从 `handle` 密钥集副本继续的管理器。
    pub fn from_handle(handle: &KeysetHandle) -> Self {
        Self {
            handle: Some(handle.clone()),
        }
    }

    fn handle_mut(&mut self) -> &mut KeysetHandle {
        self.handle.get_or_insert_with(|| {
            KeysetHandle::from_keyset(Keyset::default(), MonitoringAnnotations::new())
        })
    }

    fn keyset(&self) -> Option<&Keyset> {
        self.handle.as_ref().map(KeysetHandle::keyset)
    }

    /// Returns a handle over the current keyset.
    ///
    /// 返回当前密钥集上的句柄。
    pub fn handle(&self) -> Result<KeysetHandle> {
        match &self.handle {
            Some(handle) if handle.size() > 0 => Ok(handle.clone()),
            _ => Err(Error::InvalidKeyset("keyset is empty".to_string())),
        }
    }

    /// Adds an enabled, non-primary key generated by the global registry.
    pub fn add(&mut self, template: &KeyTemplate) -> Result<u32> {
        self.add_in(&GlobalResolver, template, false)
    }

    /// Adds an enabled key and makes it the primary.
    pub fn add_as_primary(&mut self, template: &KeyTemplate) -> Result<u32> {
        self.add_in(&GlobalResolver, template, true)
    }

    pub fn add_with_config(
        &mut self,
        template: &KeyTemplate,
        config: &Configuration,
        as_primary: bool,
    ) -> Result<u32> {
        self.add_in(config.registry(), template, as_primary)
    }

    fn add_in<R: Resolver>(
        &mut self,
        registry: &R,
        template: &KeyTemplate,
        as_primary: bool,
    ) -> Result<u32> {
        self.handle_mut().add_key_in(registry, template, as_primary)
    }

    /// Makes `key_id` the primary. The key must be enabled.
    ///
    /// 将 `key_id` 设为主密钥。该密钥必须已启用。
    pub fn set_primary(&mut self, key_id: u32) -> Result<()> {
        let key = self.find(key_id)?;
        if key.status != KeyStatus::Enabled {
            return Err(Error::InvalidKeyset(format!(
                "cannot set key {key_id} with status {:?} as primary",
                key.status
            )));
        }
        self.handle_mut().keyset_mut().primary_key_id = key_id;
        debug!(key_id, "set primary key");
        Ok(())
    }

    /// Re-enables a disabled key. Destroyed keys cannot be enabled.
    ///
    /// 重新启用已禁用的密钥。已销毁的密钥不能启用。
    pub fn enable(&mut self, key_id: u32) -> Result<()> {
        let key = self.find_mut(key_id)?;
        match key.status {
            KeyStatus::Enabled | KeyStatus::Disabled => key.status = KeyStatus::Enabled,
            status => {
                return Err(Error::InvalidKeyset(format!(
                    "cannot enable key {key_id} with status {status:?}"
                )))
            }
        }
        debug!(key_id, "enabled key");
        Ok(())
    }

    pub fn disable(&mut self, key_id: u32) -> Result<()> {
        self.ensure_not_primary(key_id, "disable")?;
        let key = self.find_mut(key_id)?;
        match key.status {
            KeyStatus::Enabled | KeyStatus::Disabled => key.status = KeyStatus::Disabled,
            status => {
                return Err(Error::InvalidKeyset(format!(
                    "cannot disable key {key_id} with status {status:?}"
                )))
            }
        }
        debug!(key_id, "disabled key");
        Ok(())
    }

    /// Wipes the key material of `key_id` and marks it destroyed. The entry
    /// stays in the keyset so its id is never reused.
    ///
    /// 擦除 `key_id` 的密钥材料并将其标记为已销毁。条目保留在密钥集中，因此其 ID 永远不会被重用。
    pub fn destroy(&mut self, key_id: u32) -> Result<()> {
        self.ensure_not_primary(key_id, "destroy")?;
        let key = self.find_mut(key_id)?;
        key.key_data.wipe();
        key.status = KeyStatus::Destroyed;
        debug!(key_id, "destroyed key");
        Ok(())
    }

    /// Removes `key_id` from the keyset.
    pub fn delete(&mut self, key_id: u32) -> Result<()> {
        self.ensure_not_primary(key_id, "delete")?;
        self.find(key_id)?;
        self.handle_mut()
            .keyset_mut()
            .keys
            .retain(|key| key.key_id != key_id);
        debug!(key_id, "deleted key");
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.keyset().map_or(0, |keyset| keyset.keys.len())
    }

    fn ensure_not_primary(&self, key_id: u32, operation: &str) -> Result<()> {
        if self.keyset().map(|keyset| keyset.primary_key_id) == Some(key_id) {
            return Err(Error::InvalidKeyset(format!(
                "cannot {operation} the primary key {key_id}"
            )));
        }
        Ok(())
    }

    fn find(&self, key_id: u32) -> Result<&KeyEntry> {
        self.keyset()
            .and_then(|keyset| keyset.find(key_id))
            .ok_or_else(|| unknown_key(key_id))
    }

    fn find_mut(&mut self, key_id: u32) -> Result<&mut KeyEntry> {
        self.handle_mut()
            .keyset_mut()
            .keys
            .iter_mut()
            .find(|key| key.key_id == key_id)
            .ok_or_else(|| unknown_key(key_id))
    }
}

fn unknown_key(key_id: u32) -> Error {
    Error::InvalidKeyset(format!("key {key_id} not found"))
}
