//! 七牛云 Kodo 驱动 / Qiniu Kodo driver

pub mod auth;
pub mod config;
pub mod driver;

use serde_json::{Map, Value};
use std::sync::Arc;

use super::{parse_config, DiskBackend};
use crate::error::Result;
use crate::storage::{Filesystem, StorageAdapter};

pub use auth::QiniuAuth;
pub use config::QiniuConfig;
pub use driver::QiniuAdapter;

/// Qiniu backend; URLs are resolved by the adapter on the bound domain / 七牛后端
pub struct QiniuBackend {
    adapter: Arc<QiniuAdapter>,
}

impl QiniuBackend {
    pub fn create(disk: &str, config: &Map<String, Value>) -> Result<(Self, Arc<dyn StorageAdapter>)> {
        let cfg: QiniuConfig = parse_config(disk, config)?;
        let adapter = Arc::new(QiniuAdapter::new(cfg));
        let shared: Arc<dyn StorageAdapter> = adapter.clone();

        Ok((QiniuBackend { adapter }, shared))
    }
}

impl DiskBackend for QiniuBackend {
    fn url(&self, path: &str, _filesystem: &Filesystem) -> Result<String> {
        Ok(self.adapter.url(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemOptions;
    use serde_json::json;

    #[test]
    fn test_url_delegates_to_adapter() {
        let config = match json!({
            "accessKey": "ak",
            "secretKey": "sk",
            "bucket": "bucket",
            "domain": "https://cdn.example.com/"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let (backend, adapter) = QiniuBackend::create("kodo", &config).unwrap();
        let fs = Filesystem::new(adapter, FilesystemOptions::default());

        assert_eq!(backend.url("a/b.txt", &fs).unwrap(), "https://cdn.example.com/a/b.txt");
        assert_eq!(backend.path("a/b.txt"), "a/b.txt");
    }
}
