// Driver package / 驱动包
pub mod local;
pub mod aliyun;
pub mod qiniu;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{FilesystemError, Result};
use crate::storage::{Filesystem, StorageAdapter};

pub use aliyun::AliyunBackend;
pub use local::LocalBackend;
pub use qiniu::QiniuBackend;

/// Configured backend type / 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverType {
    Local,
    Aliyun,
    Qiniu,
}

impl DriverType {
    pub const ALL: [DriverType; 3] = [DriverType::Local, DriverType::Aliyun, DriverType::Qiniu];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverType::Local => "local",
            DriverType::Aliyun => "aliyun",
            DriverType::Qiniu => "qiniu",
        }
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverType {
    type Err = FilesystemError;

    fn from_str(s: &str) -> Result<Self> {
        DriverType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FilesystemError::UnsupportedDriver(s.to_string()))
    }
}

/// Per-backend capabilities shared by every variant / 各后端共有的能力
pub trait DiskBackend {
    /// Fully qualified path; identity unless the backend has a physical root
    /// 完整路径，无物理根目录的后端原样返回
    fn path(&self, path: &str) -> String {
        path.to_string()
    }

    /// Public URL of `path` / 文件访问地址
    fn url(&self, _path: &str, _filesystem: &Filesystem) -> Result<String> {
        Err(FilesystemError::UrlUnsupported)
    }
}

/// Closed set of supported backends / 支持的后端
pub enum Backend {
    Local(LocalBackend),
    Aliyun(AliyunBackend),
    Qiniu(QiniuBackend),
}

impl Backend {
    /// Backend-specific defaults the disk config is merged over / 后端默认配置
    pub fn defaults(driver_type: DriverType) -> Map<String, Value> {
        match driver_type {
            DriverType::Local => LocalBackend::defaults(),
            DriverType::Aliyun | DriverType::Qiniu => Map::new(),
        }
    }

    /// Build the backend and its adapter from merged config. The factory may
    /// add derived keys to `config` before the facade reads it.
    /// 根据配置创建后端与适配器
    pub fn create(
        driver_type: DriverType,
        disk: &str,
        config: &mut Map<String, Value>,
    ) -> Result<(Backend, Arc<dyn StorageAdapter>)> {
        tracing::debug!("Creating {} adapter for disk [{}]", driver_type, disk);
        match driver_type {
            DriverType::Local => {
                let (backend, adapter) = LocalBackend::create(disk, config)?;
                Ok((Backend::Local(backend), adapter))
            }
            DriverType::Aliyun => {
                let (backend, adapter) = AliyunBackend::create(disk, config)?;
                Ok((Backend::Aliyun(backend), adapter))
            }
            DriverType::Qiniu => {
                let (backend, adapter) = QiniuBackend::create(disk, config)?;
                Ok((Backend::Qiniu(backend), adapter))
            }
        }
    }

    fn inner(&self) -> &dyn DiskBackend {
        match self {
            Backend::Local(b) => b,
            Backend::Aliyun(b) => b,
            Backend::Qiniu(b) => b,
        }
    }
}

impl DiskBackend for Backend {
    fn path(&self, path: &str) -> String {
        self.inner().path(path)
    }

    fn url(&self, path: &str, filesystem: &Filesystem) -> Result<String> {
        self.inner().url(path, filesystem)
    }
}

/// Deserialize a typed backend config from the disk map / 解析后端配置
pub(crate) fn parse_config<T: DeserializeOwned>(disk: &str, config: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| FilesystemError::invalid_config(disk, e))
}
