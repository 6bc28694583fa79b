use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{FilesystemError, Result};

/// Boxed async byte stream / 异步字节流
pub type ByteStream = Box<dyn AsyncRead + Unpin + Send>;

/// Access-control attribute of a stored object / 对象可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

/// File attributes / 文件属性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub path: String,
    pub file_size: Option<u64>,
    pub visibility: Option<Visibility>,
    /// Unix timestamp (seconds) / Unix 时间戳（秒）
    pub last_modified: Option<i64>,
    pub mime_type: Option<String>,
}

impl FileAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Directory attributes / 目录属性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    pub path: String,
    pub visibility: Option<Visibility>,
    pub last_modified: Option<i64>,
}

/// Listing entry / 列表条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageAttributes {
    File(FileAttributes),
    Dir(DirectoryAttributes),
}

impl StorageAttributes {
    pub fn path(&self) -> &str {
        match self {
            StorageAttributes::File(f) => &f.path,
            StorageAttributes::Dir(d) => &d.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StorageAttributes::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, StorageAttributes::Dir(_))
    }
}

/// Per-call write options / 写入选项
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub visibility: Option<Visibility>,
    pub directory_visibility: Option<Visibility>,
    pub mime_type: Option<String>,
}

impl WriteOptions {
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Default::default()
        }
    }

    pub fn mime_type_for(&self, path: &str) -> String {
        self.mime_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string()
        })
    }
}

/// Contents accepted by `put` / put 接受的内容
pub enum Contents {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl From<Bytes> for Contents {
    fn from(b: Bytes) -> Self {
        Contents::Bytes(b)
    }
}

impl From<Vec<u8>> for Contents {
    fn from(v: Vec<u8>) -> Self {
        Contents::Bytes(Bytes::from(v))
    }
}

impl From<String> for Contents {
    fn from(s: String) -> Self {
        Contents::Bytes(Bytes::from(s))
    }
}

impl From<&'static str> for Contents {
    fn from(s: &'static str) -> Self {
        Contents::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<ByteStream> for Contents {
    fn from(s: ByteStream) -> Self {
        Contents::Stream(s)
    }
}

/// Drain a stream into memory / 读取整个流
pub async fn read_all(path: &str, mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .map_err(|e| FilesystemError::write(path, e))?;
    Ok(Bytes::from(buf))
}

/// Storage adapter interface (primitive operations only) / 存储适配器接口
///
/// Paths handed to an adapter are already normalized by the [`Filesystem`]
/// facade: relative, `/`-separated, no `.`/`..` segments.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Adapter name / 适配器名称
    fn name(&self) -> &str;

    async fn file_exists(&self, path: &str) -> Result<bool>;

    async fn directory_exists(&self, path: &str) -> Result<bool>;

    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()>;

    /// Write from a stream; the default buffers the stream and calls `write`
    /// 流式写入，默认实现先读入内存再调用 write
    async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let contents = read_all(path, stream).await?;
        self.write(path, contents, options).await
    }

    async fn read(&self, path: &str) -> Result<Bytes>;

    async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let data = self.read(path).await?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    async fn delete(&self, path: &str) -> Result<()>;

    async fn delete_directory(&self, path: &str) -> Result<()>;

    async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()>;

    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()>;

    async fn visibility(&self, path: &str) -> Result<FileAttributes>;

    /// Size, mime type and modification time in one call / 文件元数据
    async fn metadata(&self, path: &str) -> Result<FileAttributes>;

    async fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>>;

    async fn move_file(&self, source: &str, destination: &str, options: &WriteOptions)
        -> Result<()>;

    async fn copy_file(&self, source: &str, destination: &str, options: &WriteOptions)
        -> Result<()>;

    /// Public URL of an object, if the backend can produce one / 公开访问地址
    fn public_url(&self, _path: &str) -> Result<String> {
        Err(FilesystemError::UrlUnsupported)
    }
}

pub mod path;
pub mod filesystem;
pub mod driver;
pub mod manager;

pub use filesystem::{Filesystem, FilesystemOptions};
pub use driver::Driver;
pub use manager::FilesystemManager;
pub use path::{PathPrefixer, WhitespacePathNormalizer};

#[cfg(test)]
pub(crate) mod testing;
