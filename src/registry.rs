//! Resolution of key types to primitives and of primitive interfaces to
//! wrappers.
//!
//! [`RegistryImpl`] is the table itself. It backs both the process-wide
//! [`Registry`] and the caller-owned [`Configuration`]. Managers and wrappers
//! are stored type-erased and recovered by a checked downcast on the
//! primitive interface, so asking a key type for the wrong interface is an
//! error rather than undefined behavior.
//!
//! 将密钥类型解析为原语，并将原语接口解析为包装器。
//!
//! [`RegistryImpl`] 是表本身，同时支撑进程级的 [`Registry`] 和调用方拥有的
//! [`Configuration`]。管理器和包装器以类型擦除的形式存储，并通过对原语接口的
//! 检查向下转型恢复，因此向密钥类型请求错误的接口会返回错误。
use crate::error::{Error, Result};
use crate::keyset::{KeyData, KeyTemplate};
use crate::primitive_set::PrimitiveSet;
use once_cell::sync::Lazy;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

mod configuration;
mod traits;

pub use configuration::Configuration;
pub use traits::{KeyFactory, KeyManager, PrimitiveWrapper};

struct KeyManagerEntry {
    manager_type: TypeId,
    manager_name: &'static str,
    primitive_name: &'static str,
    factory: Arc<dyn KeyFactory>,
    /// An `Arc<dyn KeyManager<Primitive = P>>`.
    manager: Box<dyn Any + Send + Sync>,
}

struct WrapperEntry {
    wrapper_type: TypeId,
    wrapper_name: &'static str,
    /// An `Arc<dyn PrimitiveWrapper<Primitive = P>>`.
    wrapper: Box<dyn Any + Send + Sync>,
}

/// The registry table. Entries are only ever added.
///
/// 注册表。条目只会被添加。
#[derive(Default)]
pub(crate) struct RegistryImpl {
    key_managers: HashMap<String, KeyManagerEntry>,
    wrappers: HashMap<TypeId, WrapperEntry>,
}

impl RegistryImpl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register_key_manager<M>(&mut self, manager: M) -> Result<()>
    where
        M: KeyManager + 'static,
    {
        let type_url = manager.type_url().to_string();
        if let Some(existing) = self.key_managers.get(&type_url) {
            if existing.manager_type == TypeId::of::<M>() {
                return Ok(());
            }
            warn!(
                type_url = %type_url,
                registered = existing.manager_name,
                rejected = type_name::<M>(),
                "rejected key manager registration"
            );
            return Err(Error::DuplicateRegistration(type_url));
        }

        let manager = Arc::new(manager);
        let erased: Arc<dyn KeyManager<Primitive = M::Primitive>> = manager.clone();
        let entry = KeyManagerEntry {
            manager_type: TypeId::of::<M>(),
            manager_name: type_name::<M>(),
            primitive_name: type_name::<M::Primitive>(),
            factory: manager,
            manager: Box::new(erased),
        };
        debug!(
            type_url = %type_url,
            primitive = entry.primitive_name,
            "registered key manager"
        );
        self.key_managers.insert(type_url, entry);
        Ok(())
    }

    pub(crate) fn register_primitive_wrapper<W>(&mut self, wrapper: W) -> Result<()>
    where
        W: PrimitiveWrapper + 'static,
    {
        let primitive = TypeId::of::<W::Primitive>();
        if let Some(existing) = self.wrappers.get(&primitive) {
            if existing.wrapper_type == TypeId::of::<W>() {
                return Ok(());
            }
            warn!(
                primitive = type_name::<W::Primitive>(),
                registered = existing.wrapper_name,
                rejected = type_name::<W>(),
                "rejected primitive wrapper registration"
            );
            return Err(Error::DuplicateRegistration(
                type_name::<W::Primitive>().to_string(),
            ));
        }

        let erased: Arc<dyn PrimitiveWrapper<Primitive = W::Primitive>> = Arc::new(wrapper);
        debug!(primitive = type_name::<W::Primitive>(), "registered primitive wrapper");
        self.wrappers.insert(
            primitive,
            WrapperEntry {
                wrapper_type: TypeId::of::<W>(),
                wrapper_name: type_name::<W>(),
                wrapper: Box::new(erased),
            },
        );
        Ok(())
    }

    pub(crate) fn is_registered(&self, type_url: &str) -> bool {
        self.key_managers.contains_key(type_url)
    }

    fn entry(&self, type_url: &str) -> Result<&KeyManagerEntry> {
        self.key_managers
            .get(type_url)
            .ok_or_else(|| Error::UnsupportedKeyType(type_url.to_string()))
    }
}

/// The lookup side of a registry.
///
/// Lookups return owned handles, so no registry lock is held while key
/// manager, factory or wrapper code runs. A key manager may therefore resolve
/// nested keys through [`Registry`] from inside [`KeyManager::primitive`].
///
/// 注册表的查找侧。查找返回拥有所有权的句柄，因此在密钥管理器、工厂或包装器代码
/// 运行期间不持有任何注册表锁。
pub(crate) trait Resolver {
    /// Returns the manager for `type_url` if it produces primitives of type `P`.
    ///
    /// 如果 `type_url` 的管理器产生 `P` 类型的原语，则返回该管理器。
    fn key_manager<P>(&self, type_url: &str) -> Result<Arc<dyn KeyManager<Primitive = P>>>
    where
        P: ?Sized + 'static;

    fn primitive_wrapper<P>(&self) -> Result<Arc<dyn PrimitiveWrapper<Primitive = P>>>
    where
        P: ?Sized + 'static;

    fn key_factory(&self, type_url: &str) -> Result<Arc<dyn KeyFactory>>;

    fn primitive<P>(&self, key_data: &KeyData) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        self.key_manager::<P>(key_data.type_url())?
            .primitive(key_data)
    }

    fn wrap<P>(&self, primitive_set: PrimitiveSet<P>) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        self.primitive_wrapper::<P>()?.wrap(primitive_set)
    }

    fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        let factory = self.key_factory(&template.type_url)?;
        let key_data = factory.new_key_data(template)?;
        if key_data.type_url() != template.type_url
            || key_data.key_material_type() != factory.key_material_type()
        {
            return Err(Error::InvalidKeyset(format!(
                "key manager for {} produced key data of type {} ({:?})",
                template.type_url,
                key_data.type_url(),
                key_data.key_material_type()
            )));
        }
        Ok(key_data)
    }

    fn public_key_data(&self, private_key_data: &KeyData) -> Result<KeyData> {
        self.key_factory(private_key_data.type_url())?
            .public_key_data(private_key_data)
    }
}

impl Resolver for RegistryImpl {
    fn key_manager<P>(&self, type_url: &str) -> Result<Arc<dyn KeyManager<Primitive = P>>>
    where
        P: ?Sized + 'static,
    {
        let entry = self.entry(type_url)?;
        entry
            .manager
            .downcast_ref::<Arc<dyn KeyManager<Primitive = P>>>()
            .cloned()
            .ok_or_else(|| Error::WrongPrimitiveType {
                type_url: type_url.to_string(),
                requested: type_name::<P>(),
                registered: entry.primitive_name,
            })
    }

    fn primitive_wrapper<P>(&self) -> Result<Arc<dyn PrimitiveWrapper<Primitive = P>>>
    where
        P: ?Sized + 'static,
    {
        self.wrappers
            .get(&TypeId::of::<P>())
            .and_then(|entry| {
                entry
                    .wrapper
                    .downcast_ref::<Arc<dyn PrimitiveWrapper<Primitive = P>>>()
            })
            .cloned()
            .ok_or(Error::NoWrapperRegistered(type_name::<P>()))
    }

    fn key_factory(&self, type_url: &str) -> Result<Arc<dyn KeyFactory>> {
        Ok(Arc::clone(&self.entry(type_url)?.factory))
    }
}

/// Resolves through the global table, taking the read lock once per lookup.
///
/// 通过全局表解析，每次查找获取一次读锁。
pub(crate) struct GlobalResolver;

impl Resolver for GlobalResolver {
    fn key_manager<P>(&self, type_url: &str) -> Result<Arc<dyn KeyManager<Primitive = P>>>
    where
        P: ?Sized + 'static,
    {
        Registry::read().key_manager(type_url)
    }

    fn primitive_wrapper<P>(&self) -> Result<Arc<dyn PrimitiveWrapper<Primitive = P>>>
    where
        P: ?Sized + 'static,
    {
        Registry::read().primitive_wrapper()
    }

    fn key_factory(&self, type_url: &str) -> Result<Arc<dyn KeyFactory>> {
        Registry::read().key_factory(type_url)
    }
}

static GLOBAL: Lazy<RwLock<RegistryImpl>> = Lazy::new(|| RwLock::new(RegistryImpl::new()));

/// The process-wide registry.
///
/// Lookups share a read lock and registrations take the write lock. The lock
/// is released before any key manager or wrapper runs. The table is
/// add-only, so a poisoned lock is recovered rather than propagated. Prefer a [`Configuration`] where the set of key types should
/// be scoped to one part of a program.
///
/// 进程级注册表。
///
/// 查找共享读锁，注册获取写锁。在任何密钥管理器或包装器运行之前释放锁。该表只增不减，因此中毒的锁会被恢复而不是传播。
/// 如果密钥类型集合应限定在程序的某一部分，请优先使用 [`Configuration`]。
pub struct Registry;

impl Registry {
    fn read() -> RwLockReadGuard<'static, RegistryImpl> {
        GLOBAL.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write() -> RwLockWriteGuard<'static, RegistryImpl> {
        GLOBAL.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a key manager under its type URL.
    ///
    /// Registering the same manager type again is a no-op; registering a
    /// different one for a type URL already taken fails with
    /// [`Error::DuplicateRegistration`].
    ///
    /// 以其类型 URL 注册密钥管理器。
    ///
    /// 再次注册相同的管理器类型是无操作；为已被占用的类型 URL 注册不同的管理器
    /// 会以 [`Error::DuplicateRegistration`] 失败。
    pub fn register_key_manager<M>(manager: M) -> Result<()>
    where
        M: KeyManager + 'static,
    {
        Self::write().register_key_manager(manager)
    }

    /// Registers the wrapper for `W::Primitive`, with the same duplicate
    /// policy as [`Registry::register_key_manager`].
    ///
    /// 为 `W::Primitive` 注册包装器，重复策略与 [`Registry::register_key_manager`] 相同。
    pub fn register_primitive_wrapper<W>(wrapper: W) -> Result<()>
    where
        W: PrimitiveWrapper + 'static,
    {
        Self::write().register_primitive_wrapper(wrapper)
    }

    pub fn is_registered(type_url: &str) -> bool {
        Self::read().is_registered(type_url)
    }

    /// Builds a primitive of type `P` from key data.
    ///
    /// 从密钥数据构建 `P` 类型的原语。
    pub fn primitive<P>(key_data: &KeyData) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        GlobalResolver.primitive(key_data)
    }

    /// Composes a primitive set with the wrapper registered for `P`.
    ///
    /// 使用为 `P` 注册的包装器组合原语集。
    pub fn wrap<P>(primitive_set: PrimitiveSet<P>) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        GlobalResolver.wrap(primitive_set)
    }

    pub fn new_key_data(template: &KeyTemplate) -> Result<KeyData> {
        GlobalResolver.new_key_data(template)
    }

    pub fn public_key_data(private_key_data: &KeyData) -> Result<KeyData> {
        GlobalResolver.public_key_data(private_key_data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::keyset::{KeyInfo, KeyMaterialType, KeyStatus, OutputPrefixType};

    pub(crate) trait Label: Send + Sync {
        fn label(&self) -> String;
    }

    pub(crate) trait Counter: Send + Sync {
        fn count(&self) -> usize;
    }

    struct Fixed(String);

    impl Label for Fixed {
        fn label(&self) -> String {
            self.0.clone()
        }
    }

    /// Produces `dyn Label` primitives whose label is the key material.
    pub(crate) struct LabelKeyManager;

    pub(crate) const LABEL_TYPE_URL: &str = "test.LabelKey";

    impl KeyFactory for LabelKeyManager {
        fn type_url(&self) -> &str {
            LABEL_TYPE_URL
        }

        fn key_material_type(&self) -> KeyMaterialType {
            KeyMaterialType::Remote
        }

        fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
            Ok(KeyData::new(
                LABEL_TYPE_URL,
                template.value.clone(),
                KeyMaterialType::Remote,
            ))
        }
    }

    impl KeyManager for LabelKeyManager {
        type Primitive = dyn Label;

        fn primitive(&self, key_data: &KeyData) -> Result<Box<dyn Label>> {
            Ok(Box::new(Fixed(
                String::from_utf8_lossy(key_data.value()).into_owned(),
            )))
        }
    }

    /// A different manager competing for the same type URL.
    struct OtherLabelKeyManager;

    impl KeyFactory for OtherLabelKeyManager {
        fn type_url(&self) -> &str {
            LABEL_TYPE_URL
        }

        fn key_material_type(&self) -> KeyMaterialType {
            KeyMaterialType::Remote
        }

        fn new_key_data(&self, _template: &KeyTemplate) -> Result<KeyData> {
            Ok(KeyData::new(LABEL_TYPE_URL, Vec::new(), KeyMaterialType::Remote))
        }
    }

    impl KeyManager for OtherLabelKeyManager {
        type Primitive = dyn Label;

        fn primitive(&self, _key_data: &KeyData) -> Result<Box<dyn Label>> {
            Ok(Box::new(Fixed(String::new())))
        }
    }

    struct Joined(PrimitiveSet<dyn Label>);

    impl Label for Joined {
        fn label(&self) -> String {
            let primary = self.0.primary().primitive().label();
            let all: Vec<String> = self
                .0
                .entries()
                .iter()
                .map(|entry| entry.primitive().label())
                .collect();
            format!("{primary}:{}", all.join(","))
        }
    }

    /// Renders `primary:all,entries` so tests can observe composition.
    pub(crate) struct LabelWrapper;

    impl PrimitiveWrapper for LabelWrapper {
        type Primitive = dyn Label;

        fn wrap(&self, primitive_set: PrimitiveSet<dyn Label>) -> Result<Box<dyn Label>> {
            Ok(Box::new(Joined(primitive_set)))
        }
    }

    struct OtherLabelWrapper;

    impl PrimitiveWrapper for OtherLabelWrapper {
        type Primitive = dyn Label;

        fn wrap(&self, primitive_set: PrimitiveSet<dyn Label>) -> Result<Box<dyn Label>> {
            Ok(Box::new(Joined(primitive_set)))
        }
    }

    fn label_data(value: &str) -> KeyData {
        KeyData::new(LABEL_TYPE_URL, value.as_bytes().to_vec(), KeyMaterialType::Remote)
    }

    #[test]
    fn test_duplicate_key_manager_policy() {
        let mut registry = RegistryImpl::new();
        registry.register_key_manager(LabelKeyManager).unwrap();
        registry.register_key_manager(LabelKeyManager).unwrap();
        assert!(matches!(
            registry.register_key_manager(OtherLabelKeyManager),
            Err(Error::DuplicateRegistration(url)) if url == LABEL_TYPE_URL
        ));
        assert_eq!(
            registry.primitive::<dyn Label>(&label_data("kept")).unwrap().label(),
            "kept"
        );
    }

    #[test]
    fn test_duplicate_wrapper_policy() {
        let mut registry = RegistryImpl::new();
        registry.register_primitive_wrapper(LabelWrapper).unwrap();
        registry.register_primitive_wrapper(LabelWrapper).unwrap();
        assert!(matches!(
            registry.register_primitive_wrapper(OtherLabelWrapper),
            Err(Error::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn test_unknown_type_url() {
        let registry = RegistryImpl::new();
        assert!(matches!(
            registry.primitive::<dyn Label>(&label_data("x")),
            Err(Error::UnsupportedKeyType(url)) if url == LABEL_TYPE_URL
        ));
    }

    #[test]
    fn test_wrong_primitive_type() {
        let mut registry = RegistryImpl::new();
        registry.register_key_manager(LabelKeyManager).unwrap();
        let err = registry
            .primitive::<dyn Counter>(&label_data("x"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::WrongPrimitiveType { ref type_url, .. } if type_url == LABEL_TYPE_URL));
    }

    #[test]
    fn test_wrap_without_wrapper() {
        let registry = RegistryImpl::new();
        let mut builder = PrimitiveSet::<dyn Label>::builder();
        builder
            .add_primary_primitive(
                Box::new(Fixed("a".to_string())),
                KeyInfo {
                    type_url: LABEL_TYPE_URL.to_string(),
                    status: KeyStatus::Enabled,
                    key_id: 1,
                    output_prefix_type: OutputPrefixType::Raw,
                },
            )
            .unwrap();
        let set = builder.build().unwrap();
        assert!(matches!(
            registry.wrap(set),
            Err(Error::NoWrapperRegistered(_))
        ));
    }

    #[test]
    fn test_new_key_data_and_no_public_key() {
        let mut registry = RegistryImpl::new();
        registry.register_key_manager(LabelKeyManager).unwrap();
        let template = KeyTemplate::new(LABEL_TYPE_URL, b"fresh".to_vec(), OutputPrefixType::Tink);
        let data = registry.new_key_data(&template).unwrap();
        assert_eq!(data.value(), b"fresh");
        assert!(matches!(
            registry.public_key_data(&data),
            Err(Error::NotAPrivateKeyset(_))
        ));
    }
}
