use crate::error::Result;
#[cfg(target_arch = "wasm32")]
use crate::error::MemoError;
use std::collections::HashMap;

/// 键值存储 - 浏览器中对应 localStorage
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// 内存存储，用于命令行和测试
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// 浏览器 localStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| MemoError::StorageUnavailable("没有 window 对象".to_string()))?;
        let inner = window
            .local_storage()
            .map_err(|e| MemoError::StorageUnavailable(format!("{:?}", e)))?
            .ok_or_else(|| MemoError::StorageUnavailable("localStorage 已被禁用".to_string()))?;
        Ok(Self { inner })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.inner
            .get_item(key)
            .map_err(|e| MemoError::Storage(format!("读取 {} 失败: {:?}", key, e)))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.inner
            .set_item(key, value)
            .map_err(|e| MemoError::Storage(format!("写入 {} 失败: {:?}", key, e)))
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.inner
            .remove_item(key)
            .map_err(|e| MemoError::Storage(format!("删除 {} 失败: {:?}", key, e)))
    }
}
