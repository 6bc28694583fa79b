//! Disk driver / 磁盘驱动
//!
//! A [`Driver`] is one configured disk: its backend (URL and path rules), the
//! adapter built from config, and the [`Filesystem`] facade wrapping it. The
//! upload helpers live here; everything else is forwarded to the facade.

use bytes::Bytes;
use serde_json::{Map, Value};

use super::{ByteStream, Contents, Filesystem, FilesystemOptions, StorageAttributes, Visibility, WriteOptions};
use crate::drivers::{Backend, DiskBackend, DriverType};
use crate::error::Result;
use crate::file::{NamingRule, UploadedFile};
use crate::utils::join_key;

pub struct Driver {
    name: String,
    driver_type: DriverType,
    config: Map<String, Value>,
    backend: Backend,
    filesystem: Filesystem,
}

impl Driver {
    /// Build a disk from its config block merged over backend defaults
    /// 以后端默认配置为底合并磁盘配置并创建驱动
    pub fn new(name: &str, driver_type: DriverType, config: Map<String, Value>) -> Result<Self> {
        let mut merged = Backend::defaults(driver_type);
        merged.extend(config);

        let (backend, adapter) = Backend::create(driver_type, name, &mut merged)?;
        let options = FilesystemOptions::from_config(name, &merged)?;

        tracing::info!(
            "Disk [{}] created with {} adapter ({})",
            name,
            driver_type,
            adapter.name()
        );

        Ok(Self {
            name: name.to_string(),
            driver_type,
            config: merged,
            backend,
            filesystem: Filesystem::new(adapter, options),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        name: &str,
        driver_type: DriverType,
        backend: Backend,
        filesystem: Filesystem,
    ) -> Self {
        Self {
            name: name.to_string(),
            driver_type,
            config: Map::new(),
            backend,
            filesystem,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_type(&self) -> DriverType {
        self.driver_type
    }

    /// Merged configuration, including derived keys / 合并后的配置
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn filesystem(&self) -> &Filesystem {
        &self.filesystem
    }

    /// Fully qualified path / 完整路径
    pub fn path(&self, path: &str) -> String {
        self.backend.path(path)
    }

    /// Public URL / 访问地址
    pub fn url(&self, path: &str) -> Result<String> {
        self.backend.url(path, &self.filesystem)
    }

    /// Store `file` under `directory` with a name derived from `rule`
    /// 按命名规则存储文件
    pub async fn put_file(
        &self,
        directory: &str,
        file: &UploadedFile,
        rule: Option<&NamingRule>,
        options: &WriteOptions,
    ) -> Result<Option<String>> {
        let rule = rule.cloned().unwrap_or_default();
        let source = file.clone();
        // Content hashing reads the whole file / 计算哈希需要读取整个文件
        let name = tokio::task::spawn_blocking(move || source.hash_name(&rule))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        self.put_file_as(directory, file, &name, options).await
    }

    /// Store `file` as `directory/name`; `None` when the write was refused
    /// 以指定文件名存储，写入失败时返回 None
    pub async fn put_file_as(
        &self,
        directory: &str,
        file: &UploadedFile,
        name: &str,
        options: &WriteOptions,
    ) -> Result<Option<String>> {
        let path = join_key(directory, name);
        let source = tokio::fs::File::open(file.real_path()).await?;
        let stream: ByteStream = Box::new(source);

        // The stream is dropped inside `put` on every path / 流在 put 内部释放
        if self.put(&path, stream, options).await? {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Write contents; write and visibility failures become `false`
    /// 写入内容，写入或可见性设置失败时返回 false
    pub async fn put(
        &self,
        path: &str,
        contents: impl Into<Contents>,
        options: &WriteOptions,
    ) -> Result<bool> {
        let result = match contents.into() {
            Contents::Bytes(bytes) => self.filesystem.write(path, bytes, options).await,
            Contents::Stream(stream) => self.filesystem.write_stream(path, stream, options).await,
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_write_failure() => {
                tracing::warn!("Disk [{}] put {} failed: {}", self.name, path, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        self.filesystem.file_exists(path).await
    }

    pub async fn directory_exists(&self, path: &str) -> Result<bool> {
        self.filesystem.directory_exists(path).await
    }

    pub async fn has(&self, path: &str) -> Result<bool> {
        self.filesystem.has(path).await
    }

    pub async fn read(&self, path: &str) -> Result<Bytes> {
        self.filesystem.read(path).await
    }

    pub async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        self.filesystem.read_stream(path).await
    }

    pub async fn write(&self, path: &str, contents: impl Into<Bytes>, options: &WriteOptions) -> Result<()> {
        self.filesystem.write(path, contents, options).await
    }

    pub async fn write_stream(&self, path: &str, stream: ByteStream, options: &WriteOptions) -> Result<()> {
        self.filesystem.write_stream(path, stream, options).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.filesystem.delete(path).await
    }

    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        self.filesystem.delete_directory(path).await
    }

    pub async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()> {
        self.filesystem.create_directory(path, options).await
    }

    pub async fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>> {
        self.filesystem.list_contents(path, deep).await
    }

    pub async fn move_file(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        self.filesystem.move_file(source, destination, options).await
    }

    pub async fn copy_file(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        self.filesystem.copy_file(source, destination, options).await
    }

    pub async fn last_modified(&self, path: &str) -> Result<i64> {
        self.filesystem.last_modified(path).await
    }

    pub async fn file_size(&self, path: &str) -> Result<u64> {
        self.filesystem.file_size(path).await
    }

    pub async fn mime_type(&self, path: &str) -> Result<String> {
        self.filesystem.mime_type(path).await
    }

    pub async fn visibility(&self, path: &str) -> Result<Visibility> {
        self.filesystem.visibility(path).await
    }

    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        self.filesystem.set_visibility(path, visibility).await
    }

    pub fn public_url(&self, path: &str) -> Result<String> {
        self.filesystem.public_url(path)
    }
}
