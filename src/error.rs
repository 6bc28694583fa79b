//! Error types / 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Disk [{0}] not found.")]
    DiskNotFound(String),

    #[error("No default disk configured.")]
    NoDefaultDisk,

    #[error("Driver [{0}] not supported.")]
    UnsupportedDriver(String),

    #[error("Invalid configuration for disk [{disk}]: {reason}")]
    InvalidConfig { disk: String, reason: String },

    #[error("This driver does not support retrieving URLs.")]
    UrlUnsupported,

    #[error("Unable to write file at location: {path}. {reason}")]
    UnableToWriteFile { path: String, reason: String },

    #[error("Unable to set visibility for file {path}. {reason}")]
    UnableToSetVisibility { path: String, reason: String },

    #[error("Unable to read file from location: {path}. {reason}")]
    UnableToReadFile { path: String, reason: String },

    #[error("Unable to delete file located at: {path}. {reason}")]
    UnableToDeleteFile { path: String, reason: String },

    #[error("Unable to delete directory located at: {path}. {reason}")]
    UnableToDeleteDirectory { path: String, reason: String },

    #[error("Unable to create a directory at {path}. {reason}")]
    UnableToCreateDirectory { path: String, reason: String },

    #[error("Unable to retrieve the {kind} for file at location: {path}. {reason}")]
    UnableToRetrieveMetadata {
        path: String,
        kind: &'static str,
        reason: String,
    },

    #[error("Unable to move file from {source_path} to {destination}. {reason}")]
    UnableToMoveFile {
        source_path: String,
        destination: String,
        reason: String,
    },

    #[error("Unable to copy file from {source_path} to {destination}. {reason}")]
    UnableToCopyFile {
        source_path: String,
        destination: String,
        reason: String,
    },

    #[error("Unable to list contents of {path}. {reason}")]
    UnableToListContents { path: String, reason: String },

    #[error("File not found at path: {0}")]
    FileNotFound(String),

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),

    #[error("Corrupted path detected: {0}")]
    CorruptedPath(String),

    #[error("Unsupported symbolic link encountered at location {0}")]
    SymbolicLinkEncountered(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl FilesystemError {
    pub(crate) fn write(path: &str, reason: impl ToString) -> Self {
        Self::UnableToWriteFile {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn read(path: &str, reason: impl ToString) -> Self {
        Self::UnableToReadFile {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn metadata(path: &str, kind: &'static str, reason: impl ToString) -> Self {
        Self::UnableToRetrieveMetadata {
            path: path.to_string(),
            kind,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_config(disk: &str, reason: impl ToString) -> Self {
        Self::InvalidConfig {
            disk: disk.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Failures that `put` folds into `false` / 被 put 转为 false 的写入失败
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Self::UnableToWriteFile { .. } | Self::UnableToSetVisibility { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FilesystemError>;
