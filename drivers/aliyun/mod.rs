//! 阿里云 OSS 驱动 / Aliyun OSS driver

pub mod config;
pub mod driver;
pub mod sign;

use serde_json::{Map, Value};
use std::sync::Arc;

use super::{parse_config, DiskBackend};
use crate::error::Result;
use crate::storage::{Filesystem, StorageAdapter};

pub use config::AliyunConfig;
pub use driver::AliyunAdapter;
pub use sign::OssSigner;

/// Aliyun backend: URLs come from the facade's `public_url` / 阿里云后端
pub struct AliyunBackend;

impl AliyunBackend {
    /// Parse the config and derive `public_url` from `domain` or `bucket.endpoint`
    /// 解析配置，并由 domain 或 bucket.endpoint 派生 public_url
    pub fn create(disk: &str, config: &mut Map<String, Value>) -> Result<(Self, Arc<dyn StorageAdapter>)> {
        let cfg: AliyunConfig = parse_config(disk, config)?;
        config.insert("public_url".to_string(), Value::String(cfg.public_url_base()));

        let adapter: Arc<dyn StorageAdapter> = Arc::new(AliyunAdapter::new(cfg));
        Ok((AliyunBackend, adapter))
    }
}

impl DiskBackend for AliyunBackend {
    fn url(&self, path: &str, filesystem: &Filesystem) -> Result<String> {
        filesystem.public_url(path)
    }
}
