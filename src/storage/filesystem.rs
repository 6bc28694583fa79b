//! Generic filesystem facade / 通用文件系统门面
//!
//! Wraps one [`StorageAdapter`] with the cross-backend policy: default
//! visibility, existence assertions and public URL prefix.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::path::WhitespacePathNormalizer;
use super::{
    ByteStream, FileAttributes, StorageAdapter, StorageAttributes, Visibility, WriteOptions,
};
use crate::error::{FilesystemError, Result};
use crate::utils::{concat_path_to_url, ensure_scheme};

/// Facade policy options / 门面策略配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilesystemOptions {
    /// Default visibility for writes / 默认写入可见性
    pub visibility: Option<Visibility>,
    /// Skip existence assertions before reads, copies and moves / 跳过存在性检查
    pub disable_asserts: bool,
    pub url: Option<String>,
    /// Public URL prefix / 公开访问地址前缀
    pub public_url: Option<String>,
}

impl FilesystemOptions {
    /// Keys forwarded from disk configuration to the facade / 转发给门面的配置项
    pub const KEYS: [&'static str; 4] = ["visibility", "disable_asserts", "url", "public_url"];

    /// Build options from a disk config, ignoring every other key / 仅提取门面相关配置
    pub fn from_config(disk: &str, config: &Map<String, Value>) -> Result<Self> {
        let filtered: Map<String, Value> = config
            .iter()
            .filter(|(k, _)| Self::KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        serde_json::from_value(Value::Object(filtered))
            .map_err(|e| FilesystemError::invalid_config(disk, e))
    }
}

pub struct Filesystem {
    adapter: Arc<dyn StorageAdapter>,
    options: FilesystemOptions,
    normalizer: WhitespacePathNormalizer,
}

impl Filesystem {
    pub fn new(adapter: Arc<dyn StorageAdapter>, options: FilesystemOptions) -> Self {
        Self {
            adapter,
            options,
            normalizer: WhitespacePathNormalizer,
        }
    }

    pub fn options(&self) -> &FilesystemOptions {
        &self.options
    }

    pub fn adapter(&self) -> &Arc<dyn StorageAdapter> {
        &self.adapter
    }

    fn normalize(&self, path: &str) -> Result<String> {
        self.normalizer.normalize_path(path)
    }

    /// Merge the configured default visibility into per-call options / 合并默认可见性
    fn write_options(&self, options: &WriteOptions) -> WriteOptions {
        let mut merged = options.clone();
        if merged.visibility.is_none() {
            merged.visibility = self.options.visibility;
        }
        merged
    }

    async fn assert_present(&self, path: &str) -> Result<()> {
        if self.options.disable_asserts {
            return Ok(());
        }
        if self.adapter.file_exists(path).await? {
            Ok(())
        } else {
            Err(FilesystemError::FileNotFound(path.to_string()))
        }
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        let path = self.normalize(path)?;
        self.adapter.file_exists(&path).await
    }

    pub async fn directory_exists(&self, path: &str) -> Result<bool> {
        let path = self.normalize(path)?;
        self.adapter.directory_exists(&path).await
    }

    /// File or directory exists / 文件或目录是否存在
    pub async fn has(&self, path: &str) -> Result<bool> {
        let path = self.normalize(path)?;
        Ok(self.adapter.file_exists(&path).await? || self.adapter.directory_exists(&path).await?)
    }

    pub async fn write(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        options: &WriteOptions,
    ) -> Result<()> {
        let path = self.normalize(path)?;
        self.adapter
            .write(&path, contents.into(), &self.write_options(options))
            .await
    }

    pub async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let path = self.normalize(path)?;
        self.adapter
            .write_stream(&path, stream, &self.write_options(options))
            .await
    }

    pub async fn read(&self, path: &str) -> Result<Bytes> {
        let path = self.normalize(path)?;
        self.assert_present(&path).await?;
        self.adapter.read(&path).await
    }

    pub async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let path = self.normalize(path)?;
        self.assert_present(&path).await?;
        self.adapter.read_stream(&path).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let path = self.normalize(path)?;
        self.adapter.delete(&path).await
    }

    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        let path = self.normalize(path)?;
        self.adapter.delete_directory(&path).await
    }

    pub async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()> {
        let path = self.normalize(path)?;
        self.adapter.create_directory(&path, options).await
    }

    pub async fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>> {
        let path = self.normalize(path)?;
        self.adapter.list_contents(&path, deep).await
    }

    pub async fn move_file(
        &self,
        source: &str,
        destination: &str,
        options: &WriteOptions,
    ) -> Result<()> {
        let source = self.normalize(source)?;
        let destination = self.normalize(destination)?;
        self.assert_present(&source).await?;
        self.adapter
            .move_file(&source, &destination, &self.write_options(options))
            .await
    }

    pub async fn copy_file(
        &self,
        source: &str,
        destination: &str,
        options: &WriteOptions,
    ) -> Result<()> {
        let source = self.normalize(source)?;
        let destination = self.normalize(destination)?;
        self.assert_present(&source).await?;
        self.adapter
            .copy_file(&source, &destination, &self.write_options(options))
            .await
    }

    async fn metadata(&self, path: &str) -> Result<FileAttributes> {
        let path = self.normalize(path)?;
        self.adapter.metadata(&path).await
    }

    pub async fn last_modified(&self, path: &str) -> Result<i64> {
        self.metadata(path)
            .await?
            .last_modified
            .ok_or_else(|| FilesystemError::metadata(path, "last_modified", "not reported by adapter"))
    }

    pub async fn file_size(&self, path: &str) -> Result<u64> {
        self.metadata(path)
            .await?
            .file_size
            .ok_or_else(|| FilesystemError::metadata(path, "file_size", "not reported by adapter"))
    }

    pub async fn mime_type(&self, path: &str) -> Result<String> {
        self.metadata(path)
            .await?
            .mime_type
            .ok_or_else(|| FilesystemError::metadata(path, "mime_type", "not reported by adapter"))
    }

    pub async fn visibility(&self, path: &str) -> Result<Visibility> {
        let path = self.normalize(path)?;
        self.adapter
            .visibility(&path)
            .await?
            .visibility
            .ok_or_else(|| FilesystemError::metadata(&path, "visibility", "not reported by adapter"))
    }

    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let path = self.normalize(path)?;
        self.adapter.set_visibility(&path, visibility).await
    }

    /// Public URL: configured prefix first, then the adapter's own resolver
    /// 公开地址：优先使用 public_url 前缀，否则交给适配器
    pub fn public_url(&self, path: &str) -> Result<String> {
        let path = self.normalize(path)?;
        match self.options.public_url.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                // A bare host prefix gets `https://` so the result is an absolute URL
                Ok(concat_path_to_url(&ensure_scheme(prefix, "https"), &path))
            }
            _ => self.adapter.public_url(&path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::MemoryAdapter;
    use serde_json::json;

    fn filesystem(config: Value) -> (Arc<MemoryAdapter>, Filesystem) {
        let adapter = Arc::new(MemoryAdapter::default());
        let options = FilesystemOptions::from_config("test", config.as_object().unwrap()).unwrap();
        (adapter.clone(), Filesystem::new(adapter, options))
    }

    #[test]
    fn test_options_keep_only_known_keys() {
        let config = json!({
            "type": "local",
            "root": "/data",
            "visibility": "public",
            "disable_asserts": true,
            "url": "http://cdn.example.com",
            "public_url": "cdn.example.com",
        });
        let options = FilesystemOptions::from_config("local", config.as_object().unwrap()).unwrap();
        assert_eq!(
            options,
            FilesystemOptions {
                visibility: Some(Visibility::Public),
                disable_asserts: true,
                url: Some("http://cdn.example.com".to_string()),
                public_url: Some("cdn.example.com".to_string()),
            }
        );
    }

    #[test]
    fn test_options_reject_bad_visibility() {
        let config = json!({ "visibility": "world" });
        let err = FilesystemOptions::from_config("local", config.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, FilesystemError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_write_applies_default_visibility() {
        let (adapter, fs) = filesystem(json!({ "visibility": "public" }));
        fs.write("/a//b.txt", "hello", &WriteOptions::default()).await.unwrap();

        assert_eq!(adapter.visibility_of("a/b.txt"), Some(Visibility::Public));
        assert_eq!(fs.read("a/b.txt").await.unwrap(), Bytes::from("hello"));
        assert_eq!(fs.visibility("a/b.txt").await.unwrap(), Visibility::Public);
    }

    #[tokio::test]
    async fn test_read_missing_asserts() {
        let (_, fs) = filesystem(json!({}));
        let err = fs.read("missing.txt").await.unwrap_err();
        assert!(matches!(err, FilesystemError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_read_missing_without_asserts_reaches_adapter() {
        let (_, fs) = filesystem(json!({ "disable_asserts": true }));
        let err = fs.read("missing.txt").await.unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToReadFile { .. }));
    }

    #[tokio::test]
    async fn test_traversal_is_rejected_before_adapter() {
        let (adapter, fs) = filesystem(json!({}));
        let err = fs.write("../escape.txt", "x", &WriteOptions::default()).await.unwrap_err();
        assert!(matches!(err, FilesystemError::PathTraversal(_)));
        assert_eq!(adapter.file_count(), 0);
    }

    #[test]
    fn test_public_url_prefix() {
        let (_, fs) = filesystem(json!({ "public_url": "mybucket.oss-cn.example.com" }));
        assert_eq!(
            fs.public_url("/a/b.txt").unwrap(),
            "https://mybucket.oss-cn.example.com/a/b.txt"
        );

        let (_, fs) = filesystem(json!({ "public_url": "http://cdn.example.com/" }));
        assert_eq!(fs.public_url("a.png").unwrap(), "http://cdn.example.com/a.png");
    }

    #[test]
    fn test_public_url_falls_back_to_adapter() {
        let (_, fs) = filesystem(json!({}));
        assert!(matches!(fs.public_url("a.txt"), Err(FilesystemError::UrlUnsupported)));
    }
}
