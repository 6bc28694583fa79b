//! In-memory adapter with failure injection for unit tests

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{
    read_all, ByteStream, FileAttributes, StorageAdapter, StorageAttributes,
    Visibility, WriteOptions,
};
use crate::error::{FilesystemError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    None,
    Write,
    Visibility,
    Io,
}

pub struct MemoryAdapter {
    files: Mutex<BTreeMap<String, (Bytes, Option<Visibility>)>>,
    failure: Mutex<Failure>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            failure: Mutex::new(Failure::None),
        }
    }
}

impl MemoryAdapter {
    pub fn failing(failure: Failure) -> Self {
        let adapter = Self::default();
        *adapter.failure.lock().unwrap() = failure;
        adapter
    }

    pub fn visibility_of(&self, path: &str) -> Option<Visibility> {
        self.files.lock().unwrap().get(path).and_then(|(_, v)| *v)
    }

    pub fn contents_of(&self, path: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(path).map(|(b, _)| b.clone())
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn check(&self, path: &str) -> Result<()> {
        match *self.failure.lock().unwrap() {
            Failure::None => Ok(()),
            Failure::Write => Err(FilesystemError::write(path, "injected")),
            Failure::Visibility => Err(FilesystemError::UnableToSetVisibility {
                path: path.to_string(),
                reason: "injected".to_string(),
            }),
            Failure::Io => Err(FilesystemError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "injected",
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn directory_exists(&self, path: &str) -> Result<bool> {
        let prefix = format!("{}/", path);
        Ok(self.files.lock().unwrap().keys().any(|k| k.starts_with(&prefix)))
    }

    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()> {
        self.check(path)?;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (contents, options.visibility));
        Ok(())
    }

    async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let contents = read_all(path, stream).await?;
        self.write(path, contents, options).await
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        self.contents_of(path)
            .ok_or_else(|| FilesystemError::read(path, "no such file"))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        let prefix = format!("{}/", path);
        self.files.lock().unwrap().retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    async fn create_directory(&self, _path: &str, _options: &WriteOptions) -> Result<()> {
        Ok(())
    }

    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        if let Some(entry) = self.files.lock().unwrap().get_mut(path) {
            entry.1 = Some(visibility);
        }
        Ok(())
    }

    async fn visibility(&self, path: &str) -> Result<FileAttributes> {
        Ok(FileAttributes {
            visibility: self.visibility_of(path),
            ..FileAttributes::new(path)
        })
    }

    async fn metadata(&self, path: &str) -> Result<FileAttributes> {
        let data = self
            .contents_of(path)
            .ok_or_else(|| FilesystemError::metadata(path, "metadata", "no such file"))?;
        Ok(FileAttributes {
            file_size: Some(data.len() as u64),
            mime_type: Some(WriteOptions::default().mime_type_for(path)),
            last_modified: Some(0),
            ..FileAttributes::new(path)
        })
    }

    async fn list_contents(&self, path: &str, _deep: bool) -> Result<Vec<StorageAttributes>> {
        let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .map(|k| StorageAttributes::File(FileAttributes::new(k.clone())))
            .collect())
    }

    async fn move_file(&self, source: &str, destination: &str, _o: &WriteOptions) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        let entry = files
            .remove(source)
            .ok_or_else(|| FilesystemError::read(source, "no such file"))?;
        files.insert(destination.to_string(), entry);
        Ok(())
    }

    async fn copy_file(&self, source: &str, destination: &str, _o: &WriteOptions) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        let entry = files
            .get(source)
            .cloned()
            .ok_or_else(|| FilesystemError::read(source, "no such file"))?;
        files.insert(destination.to_string(), entry);
        Ok(())
    }
}
