use super::{KeyManager, PrimitiveWrapper, RegistryImpl, Resolver};
use crate::error::Result;
use crate::keyset::{KeyData, KeyTemplate};
use crate::primitive_set::PrimitiveSet;

/// A registry owned by the caller.
///
/// Unlike the global [`Registry`](super::Registry), a `Configuration` is only
/// visible to code it is passed to. Registration takes `&mut self`, so it
/// cannot change while a handle is reading from it; once populated it can be
/// shared by reference across threads.
///
/// 调用方拥有的注册表。
///
/// 与全局 [`Registry`](super::Registry) 不同，`Configuration` 只对传入它的代码可见。
/// 注册需要 `&mut self`，因此在句柄读取它时无法更改；填充完成后可以通过引用在线程间共享。
#[derive(Default)]
pub struct Configuration {
    registry: RegistryImpl,
}

impl Configuration {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration holding every built-in key manager and wrapper.
    ///
    /// 创建包含所有内置密钥管理器和包装器的配置。
    pub fn with_defaults() -> Result<Self> {
        let mut config = Self::new();
        crate::aead::install(&mut config.registry)?;
        crate::mac::install(&mut config.registry)?;
        crate::signature::install(&mut config.registry)?;
        Ok(config)
    }

    pub fn register_key_manager<M>(&mut self, manager: M) -> Result<()>
    where
        M: KeyManager + 'static,
    {
        self.registry.register_key_manager(manager)
    }

    pub fn register_primitive_wrapper<W>(&mut self, wrapper: W) -> Result<()>
    where
        W: PrimitiveWrapper + 'static,
    {
        self.registry.register_primitive_wrapper(wrapper)
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.registry.is_registered(type_url)
    }

    pub fn primitive<P>(&self, key_data: &KeyData) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        self.registry.primitive(key_data)
    }

    pub fn wrap<P>(&self, primitive_set: PrimitiveSet<P>) -> Result<Box<P>>
    where
        P: ?Sized + 'static,
    {
        self.registry.wrap(primitive_set)
    }

    pub fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        self.registry.new_key_data(template)
    }

    pub fn public_key_data(&self, private_key_data: &KeyData) -> Result<KeyData> {
        self.registry.public_key_data(private_key_data)
    }

    pub(crate) fn registry(&self) -> &RegistryImpl {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut RegistryImpl {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{Label, LabelKeyManager, LABEL_TYPE_URL};
    use crate::registry::Registry;
    use crate::keyset::KeyMaterialType;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_configuration_is_send_sync() {
        assert_send_sync::<Configuration>();
    }

    #[test]
    fn test_configuration_is_isolated_from_global() {
        let mut config = Configuration::new();
        config.register_key_manager(LabelKeyManager).unwrap();
        assert!(config.is_registered(LABEL_TYPE_URL));
        assert!(!Registry::is_registered(LABEL_TYPE_URL));

        let data = KeyData::new(LABEL_TYPE_URL, b"scoped".to_vec(), KeyMaterialType::Remote);
        assert_eq!(config.primitive::<dyn Label>(&data).unwrap().label(), "scoped");
        assert!(Registry::primitive::<dyn Label>(&data).is_err());
    }

    #[test]
    fn test_with_defaults_registers_builtins() {
        let config = Configuration::with_defaults().unwrap();
        assert!(config.is_registered(crate::aead::AES_GCM_TYPE_URL));
        assert!(config.is_registered(crate::mac::HMAC_TYPE_URL));
        assert!(config.is_registered(crate::signature::ECDSA_PRIVATE_KEY_TYPE_URL));
        assert!(config.is_registered(crate::signature::ECDSA_PUBLIC_KEY_TYPE_URL));
    }
}
