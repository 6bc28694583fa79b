use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::Driver;
use crate::config::{lookup, ConfigRepository};
use crate::drivers::DriverType;
use crate::error::{FilesystemError, Result};

/// Top-level configuration namespace / 配置命名空间
const NAMESPACE: &str = "filesystem";
const DEFAULT_DRIVER_TYPE: &str = "local";

/// Disk manager (resolves and caches disks by name) / 磁盘管理器
///
/// The cache is owned by one manager and mutated through `&mut self`; share
/// a manager across tasks by wrapping it in a lock.
pub struct FilesystemManager {
    config: ConfigRepository,
    disks: HashMap<String, Arc<Driver>>,
}

impl FilesystemManager {
    pub fn new(config: ConfigRepository) -> Self {
        Self {
            config,
            disks: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ConfigRepository {
        &self.config
    }

    /// Get a disk by name, or the default disk / 获取磁盘，未指定时使用默认磁盘
    pub fn disk(&mut self, name: Option<&str>) -> Result<Arc<Driver>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.get_default_driver().ok_or(FilesystemError::NoDefaultDisk)?,
        };

        if let Some(driver) = self.disks.get(&name) {
            return Ok(driver.clone());
        }

        let driver = Arc::new(self.create_disk(&name)?);
        self.disks.insert(name.clone(), driver.clone());
        tracing::info!("Disk registered: {}", name);
        Ok(driver)
    }

    fn create_disk(&self, name: &str) -> Result<Driver> {
        let config = self.resolve_config(name)?;
        let driver_type: DriverType = self.resolve_type(name)?.parse()?;
        Driver::new(name, driver_type, config)
    }

    /// Backend type of a disk, `local` when unset / 磁盘后端类型
    pub fn resolve_type(&self, name: &str) -> Result<String> {
        match self.get_disk_config(name, Some("type"), None)? {
            None => Ok(DEFAULT_DRIVER_TYPE.to_string()),
            Some(Value::String(t)) => Ok(t),
            Some(other) => Err(FilesystemError::invalid_config(
                name,
                format!("`type` must be a string, got {}", other),
            )),
        }
    }

    /// Full configuration block of a disk / 磁盘完整配置
    pub fn resolve_config(&self, name: &str) -> Result<Map<String, Value>> {
        match self.get_disk_config(name, None, None)? {
            Some(Value::Object(map)) => Ok(map),
            _ => Err(FilesystemError::DiskNotFound(name.to_string())),
        }
    }

    /// Read `filesystem.<key>`, or the whole namespace / 读取 filesystem 配置
    pub fn get_config(&self, key: Option<&str>, default: Option<Value>) -> Option<Value> {
        let full_key = match key {
            Some(key) if !key.is_empty() => format!("{}.{}", NAMESPACE, key),
            _ => NAMESPACE.to_string(),
        };
        self.config.get(&full_key).cloned().or(default)
    }

    /// Read a disk block, then an optional dotted key inside it. An absent
    /// disk is an error; an absent key falls back to `default`.
    /// 读取磁盘配置，磁盘不存在时报错，键不存在时返回默认值
    pub fn get_disk_config(
        &self,
        disk: &str,
        key: Option<&str>,
        default: Option<Value>,
    ) -> Result<Option<Value>> {
        // Disk names may contain dots, so index the map directly / 磁盘名可能含点号
        let block = self
            .config
            .get(&format!("{}.disks", NAMESPACE))
            .and_then(|disks| disks.get(disk))
            .filter(|block| block.as_object().map_or(false, |m| !m.is_empty()))
            .ok_or_else(|| FilesystemError::DiskNotFound(disk.to_string()))?;

        match key {
            None => Ok(Some(block.clone())),
            Some(key) => Ok(lookup(block, key).cloned().or(default)),
        }
    }

    /// Name of the default disk / 默认磁盘名
    pub fn get_default_driver(&self) -> Option<String> {
        self.get_config(Some("default"), None)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|name| !name.is_empty())
    }

    /// Drop a cached disk so the next lookup rebuilds it / 移除缓存的磁盘
    pub fn forget_disk(&mut self, name: &str) -> Option<Arc<Driver>> {
        let removed = self.disks.remove(name);
        if removed.is_some() {
            tracing::info!("Disk removed from cache: {}", name);
        }
        removed
    }

    /// Names of cached disks, sorted / 已缓存的磁盘名
    pub fn cached_disks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.disks.keys().cloned().collect();
        names.sort();
        names
    }
}
