use async_trait::async_trait;
use bytes::Bytes;
use fs2::FileExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::config::{LinkHandling, LockMode};
use super::visibility::PortableVisibilityConverter;
use crate::error::{FilesystemError, Result};
use crate::storage::{
    ByteStream, DirectoryAttributes, FileAttributes, PathPrefixer, StorageAdapter,
    StorageAttributes, Visibility, WriteOptions,
};

/// Local filesystem adapter / 本地文件系统适配器
pub struct LocalAdapter {
    root: PathBuf,
    prefixer: PathPrefixer,
    visibility: PortableVisibilityConverter,
    lock: LockMode,
    links: LinkHandling,
}

impl LocalAdapter {
    /// Create the adapter, creating the root directory if missing / 创建适配器，根目录不存在时自动创建
    pub fn new(
        root: &str,
        visibility: PortableVisibilityConverter,
        lock: LockMode,
        links: LinkHandling,
    ) -> Result<Self> {
        let root = if root.is_empty() { "." } else { root };
        let root_path = PathBuf::from(root);

        if !root_path.exists() {
            let mode = visibility.for_directory(visibility.default_for_directories());
            create_dir_all_with_mode(&root_path, mode).map_err(|e| {
                FilesystemError::UnableToCreateDirectory {
                    path: root.to_string(),
                    reason: e.to_string(),
                }
            })?;
        }

        tracing::info!("Local adapter initialized, root: {:?}", root_path);

        Ok(Self {
            prefixer: PathPrefixer::platform(root),
            root: root_path,
            visibility,
            lock,
            links,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        PathBuf::from(self.prefixer.prefix_path(path))
    }

    fn directory_mode(&self, options: &WriteOptions) -> u32 {
        let visibility = options
            .directory_visibility
            .unwrap_or_else(|| self.visibility.default_for_directories());
        self.visibility.for_directory(visibility)
    }

    /// Relative `/`-separated key for a path under root / 根目录下路径转为存储键
    fn relative_key(root: &Path, full: &Path) -> String {
        full.strip_prefix(root)
            .unwrap_or(full)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn apply_file_visibility(&self, path: &str, full: &Path, visibility: Option<Visibility>) -> Result<()> {
        if let Some(v) = visibility {
            set_mode(full, self.visibility.for_file(v)).map_err(|e| {
                FilesystemError::UnableToSetVisibility {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(())
    }

    /// Open the target for writing under the configured lock / 按锁模式打开目标文件
    async fn open_locked(&self, path: &str, options: &WriteOptions) -> Result<std::fs::File> {
        let full = self.full_path(path);
        let dir_mode = self.directory_mode(options);
        let lock = self.lock;

        tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            if let Some(parent) = full.parent() {
                create_dir_all_with_mode(parent, dir_mode)?;
            }
            let file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&full)?;
            match lock {
                LockMode::Exclusive => file.lock_exclusive()?,
                LockMode::Shared => file.lock_shared()?,
                LockMode::None => {}
            }
            file.set_len(0)?;
            Ok(file)
        })
        .await
        .map_err(|e| FilesystemError::write(path, e))?
        .map_err(|e| FilesystemError::write(path, e))
    }
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        match tokio::fs::metadata(self.full_path(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FilesystemError::metadata(path, "existence", e)),
        }
    }

    async fn directory_exists(&self, path: &str) -> Result<bool> {
        match tokio::fs::metadata(self.full_path(path)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FilesystemError::metadata(path, "existence", e)),
        }
    }

    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()> {
        let mut file = self.open_locked(path, options).await?;

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            file.write_all(&contents)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| FilesystemError::write(path, e))?
        .map_err(|e| FilesystemError::write(path, e))?;
        // Lock is released when the handle drops / 句柄释放时解锁
        drop(file);

        self.apply_file_visibility(path, &self.full_path(path), options.visibility)
    }

    async fn write_stream(
        &self,
        path: &str,
        mut stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let file = self.open_locked(path, options).await?;
        let mut file = tokio::fs::File::from_std(file);

        tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|e| FilesystemError::write(path, e))?;
        file.flush().await.map_err(|e| FilesystemError::write(path, e))?;
        drop(file);

        self.apply_file_visibility(path, &self.full_path(path), options.visibility)
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        tokio::fs::read(self.full_path(path))
            .await
            .map(Bytes::from)
            .map_err(|e| FilesystemError::read(path, e))
    }

    async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let file = tokio::fs::File::open(self.full_path(path))
            .await
            .map_err(|e| FilesystemError::read(path, e))?;
        Ok(Box::new(file))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FilesystemError::UnableToDeleteFile {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_dir_all(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FilesystemError::UnableToDeleteDirectory {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()> {
        let full = self.full_path(path);
        let mode = self.directory_mode(options);
        tokio::task::spawn_blocking(move || create_dir_all_with_mode(&full, mode))
            .await
            .map_err(std::io::Error::from)
            .and_then(|r| r)
            .map_err(|e| FilesystemError::UnableToCreateDirectory {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        self.apply_file_visibility(path, &self.full_path(path), Some(visibility))
    }

    async fn visibility(&self, path: &str) -> Result<FileAttributes> {
        let meta = tokio::fs::metadata(self.full_path(path))
            .await
            .map_err(|e| FilesystemError::metadata(path, "visibility", e))?;
        Ok(FileAttributes {
            visibility: Some(self.visibility.inverse_for_file(mode_of(&meta))),
            ..FileAttributes::new(path)
        })
    }

    async fn metadata(&self, path: &str) -> Result<FileAttributes> {
        let meta = tokio::fs::metadata(self.full_path(path))
            .await
            .map_err(|e| FilesystemError::metadata(path, "metadata", e))?;
        if !meta.is_file() {
            return Err(FilesystemError::metadata(path, "metadata", "not a file"));
        }
        Ok(FileAttributes {
            file_size: Some(meta.len()),
            visibility: Some(self.visibility.inverse_for_file(mode_of(&meta))),
            last_modified: modified_secs(&meta),
            mime_type: Some(WriteOptions::default().mime_type_for(path)),
            ..FileAttributes::new(path)
        })
    }

    async fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>> {
        let dir = self.full_path(path);
        let root = self.root.clone();
        let links = self.links;
        let converter = self.visibility;

        let listed = tokio::task::spawn_blocking(move || -> Result<Vec<StorageAttributes>> {
            if !dir.is_dir() {
                return Ok(Vec::new());
            }

            let walker = walkdir::WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(if deep { usize::MAX } else { 1 })
                .follow_links(false)
                .sort_by_file_name();

            let mut entries = Vec::new();
            for entry in walker {
                let entry = entry.map_err(|e| FilesystemError::UnableToListContents {
                    path: dir.to_string_lossy().into_owned(),
                    reason: e.to_string(),
                })?;
                let key = Self::relative_key(&root, entry.path());

                if entry.path_is_symlink() {
                    match links {
                        LinkHandling::Skip => continue,
                        LinkHandling::Disallow => {
                            return Err(FilesystemError::SymbolicLinkEncountered(key));
                        }
                    }
                }

                let meta = entry.metadata().map_err(|e| FilesystemError::UnableToListContents {
                    path: key.clone(),
                    reason: e.to_string(),
                })?;
                let last_modified = modified_secs(&meta);

                if meta.is_dir() {
                    entries.push(StorageAttributes::Dir(DirectoryAttributes {
                        visibility: Some(converter.inverse_for_directory(mode_of(&meta))),
                        last_modified,
                        path: key,
                    }));
                } else {
                    entries.push(StorageAttributes::File(FileAttributes {
                        file_size: Some(meta.len()),
                        visibility: Some(converter.inverse_for_file(mode_of(&meta))),
                        last_modified,
                        mime_type: None,
                        path: key,
                    }));
                }
            }
            Ok(entries)
        })
        .await
        .map_err(|e| FilesystemError::UnableToListContents {
            path: path.to_string(),
            reason: e.to_string(),
        })??;

        Ok(listed)
    }

    async fn move_file(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        let from = self.full_path(source);
        let to = self.full_path(destination);
        let dir_mode = self.directory_mode(options);
        let err = |e: std::io::Error| FilesystemError::UnableToMoveFile {
            source_path: source.to_string(),
            destination: destination.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = to.parent() {
            create_dir_all_with_mode(parent, dir_mode).map_err(err)?;
        }
        tokio::fs::rename(&from, &to).await.map_err(err)?;
        self.apply_file_visibility(destination, &to, options.visibility)
    }

    async fn copy_file(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        let from = self.full_path(source);
        let to = self.full_path(destination);
        let dir_mode = self.directory_mode(options);
        let err = |e: std::io::Error| FilesystemError::UnableToCopyFile {
            source_path: source.to_string(),
            destination: destination.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = to.parent() {
            create_dir_all_with_mode(parent, dir_mode).map_err(err)?;
        }
        tokio::fs::copy(&from, &to).await.map_err(err)?;
        self.apply_file_visibility(destination, &to, options.visibility)
    }
}

fn modified_secs(meta: &std::fs::Metadata) -> Option<i64> {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

/// Create a directory tree; new directories get `mode` / 递归创建目录并设置权限
fn create_dir_all_with_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new().recursive(true).mode(mode).create(path)
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        std::fs::create_dir_all(path)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    std::fs::set_permissions(path, perms)
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(root: &Path, links: LinkHandling) -> LocalAdapter {
        LocalAdapter::new(
            root.to_str().unwrap(),
            PortableVisibilityConverter::default(),
            LockMode::Exclusive,
            links,
        )
        .unwrap()
    }

    #[test]
    fn test_new_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/root");
        adapter(&root, LinkHandling::Disallow);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(dir.path(), LinkHandling::Disallow);

        a.write("a/b/c.txt", Bytes::from("hello"), &WriteOptions::default()).await.unwrap();
        assert!(a.file_exists("a/b/c.txt").await.unwrap());
        assert!(a.directory_exists("a/b").await.unwrap());
        assert!(!a.file_exists("a/b").await.unwrap());
        assert_eq!(a.read("a/b/c.txt").await.unwrap(), Bytes::from("hello"));

        // Overwrite truncates / 覆盖写入会截断
        a.write("a/b/c.txt", Bytes::from("hi"), &WriteOptions::default()).await.unwrap();
        assert_eq!(a.read("a/b/c.txt").await.unwrap(), Bytes::from("hi"));

        let meta = a.metadata("a/b/c.txt").await.unwrap();
        assert_eq!(meta.file_size, Some(2));
        assert_eq!(meta.mime_type.as_deref(), Some("text/plain"));
        assert!(meta.last_modified.is_some());

        a.delete("a/b/c.txt").await.unwrap();
        assert!(!a.file_exists("a/b/c.txt").await.unwrap());
        // Deleting twice is fine / 重复删除不报错
        a.delete("a/b/c.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_write_stream() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(dir.path(), LinkHandling::Disallow);
        let stream: ByteStream = Box::new(std::io::Cursor::new(b"streamed".to_vec()));

        a.write_stream("s.bin", stream, &WriteOptions::default()).await.unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("s.bin")).unwrap(),
            b"streamed".to_vec()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_visibility_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(dir.path(), LinkHandling::Disallow);

        a.write("v.txt", Bytes::from("x"), &WriteOptions::with_visibility(Visibility::Private))
            .await
            .unwrap();
        assert_eq!(a.visibility("v.txt").await.unwrap().visibility, Some(Visibility::Private));

        a.set_visibility("v.txt", Visibility::Public).await.unwrap();
        assert_eq!(a.visibility("v.txt").await.unwrap().visibility, Some(Visibility::Public));
        assert_eq!(mode_of(&std::fs::metadata(dir.path().join("v.txt")).unwrap()), 0o644);
    }

    #[tokio::test]
    async fn test_set_visibility_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(dir.path(), LinkHandling::Disallow);
        let err = a.set_visibility("missing.txt", Visibility::Public).await.unwrap_err();
        assert!(matches!(err, FilesystemError::UnableToSetVisibility { .. }));
    }

    #[tokio::test]
    async fn test_list_contents() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(dir.path(), LinkHandling::Disallow);
        let o = WriteOptions::default();
        a.write("docs/a.txt", Bytes::from("a"), &o).await.unwrap();
        a.write("docs/sub/b.txt", Bytes::from("b"), &o).await.unwrap();
        a.write("top.txt", Bytes::from("t"), &o).await.unwrap();

        let shallow: Vec<String> = a
            .list_contents("docs", false)
            .await
            .unwrap()
            .iter()
            .map(|e| e.path().to_string())
            .collect();
        assert_eq!(shallow, vec!["docs/a.txt", "docs/sub"]);

        let deep = a.list_contents("", true).await.unwrap();
        let files: Vec<&str> = deep.iter().filter(|e| e.is_file()).map(|e| e.path()).collect();
        assert_eq!(files, vec!["docs/a.txt", "docs/sub/b.txt", "top.txt"]);

        assert!(a.list_contents("missing", true).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_policy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), "r").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();

        let skipping = adapter(dir.path(), LinkHandling::Skip);
        let listed = skipping.list_contents("", false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path(), "real.txt");

        let strict = adapter(dir.path(), LinkHandling::Disallow);
        let err = strict.list_contents("", false).await.unwrap_err();
        assert!(matches!(err, FilesystemError::SymbolicLinkEncountered(p) if p == "link.txt"));
    }

    #[tokio::test]
    async fn test_move_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let a = adapter(dir.path(), LinkHandling::Disallow);
        let o = WriteOptions::default();
        a.write("src.txt", Bytes::from("data"), &o).await.unwrap();

        a.copy_file("src.txt", "copies/one.txt", &o).await.unwrap();
        a.move_file("src.txt", "moved/two.txt", &o).await.unwrap();

        assert!(!a.file_exists("src.txt").await.unwrap());
        assert_eq!(a.read("copies/one.txt").await.unwrap(), Bytes::from("data"));
        assert_eq!(a.read("moved/two.txt").await.unwrap(), Bytes::from("data"));

        a.delete_directory("copies").await.unwrap();
        assert!(!a.directory_exists("copies").await.unwrap());
    }
}
