//! 本地存储驱动 / Local disk driver

pub mod config;
pub mod driver;
pub mod visibility;

use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{parse_config, DiskBackend};
use crate::error::{FilesystemError, Result};
use crate::storage::{
    Filesystem, PathPrefixer, StorageAdapter, Visibility, WhitespacePathNormalizer,
};
use crate::utils::concat_path_to_url;

pub use config::{LinkHandling, LocalConfig, LockMode};
pub use driver::LocalAdapter;
pub use visibility::PortableVisibilityConverter;

/// Local backend: physical root plus optional base URL / 本地后端
pub struct LocalBackend {
    prefixer: PathPrefixer,
    normalizer: WhitespacePathNormalizer,
    url: Option<String>,
}

impl LocalBackend {
    pub fn defaults() -> Map<String, Value> {
        match json!({ "root": "" }) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    pub fn create(disk: &str, config: &Map<String, Value>) -> Result<(Self, Arc<dyn StorageAdapter>)> {
        let cfg: LocalConfig = parse_config(disk, config)?;

        let visibility = PortableVisibilityConverter::from_permissions(
            &cfg.permissions,
            cfg.visibility.unwrap_or(Visibility::Private),
        );
        let adapter: Arc<dyn StorageAdapter> = Arc::new(LocalAdapter::new(
            &cfg.root,
            visibility,
            cfg.lock,
            cfg.link_handling(),
        )?);

        let backend = Self {
            prefixer: PathPrefixer::platform(&cfg.root),
            normalizer: WhitespacePathNormalizer,
            url: cfg.url,
        };
        Ok((backend, adapter))
    }
}

impl DiskBackend for LocalBackend {
    fn path(&self, path: &str) -> String {
        self.prefixer.prefix_path(path)
    }

    fn url(&self, path: &str, _filesystem: &Filesystem) -> Result<String> {
        let path = self.normalizer.normalize_path(path)?;
        match &self.url {
            Some(base) => Ok(concat_path_to_url(base, &path)),
            None => Err(FilesystemError::UrlUnsupported),
        }
    }
}
