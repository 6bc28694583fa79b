//! Path normalization and prefixing / 路径规范化与前缀处理

use crate::error::{FilesystemError, Result};

/// Normalizes storage paths: `\` becomes `/`, `.` and empty segments are
/// dropped, `..` pops a segment and may never climb above the root.
/// 规范化存储路径，拒绝越过根目录的 `..`
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespacePathNormalizer;

impl WhitespacePathNormalizer {
    pub fn normalize_path(&self, path: &str) -> Result<String> {
        let path = path.replace('\\', "/");

        // Control and format characters never belong in a key / 拒绝控制字符
        if path.chars().any(|c| c.is_control() || is_format_char(c)) {
            return Err(FilesystemError::CorruptedPath(path.escape_debug().to_string()));
        }

        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    if parts.pop().is_none() {
                        return Err(FilesystemError::PathTraversal(path.clone()));
                    }
                }
                _ => parts.push(part),
            }
        }

        Ok(parts.join("/"))
    }
}

fn is_format_char(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}')
}

const SEPARATORS: [char; 2] = ['\\', '/'];

/// Prepends a root directory to relative paths / 为相对路径添加根目录前缀
#[derive(Debug, Clone)]
pub struct PathPrefixer {
    prefix: String,
    separator: char,
}

impl PathPrefixer {
    pub fn new(prefix: &str, separator: char) -> Self {
        let trimmed = prefix.trim_end_matches(&SEPARATORS[..]);
        let mut prefix_owned = trimmed.to_string();
        if !trimmed.is_empty() || prefix == separator.to_string() {
            prefix_owned.push(separator);
        }
        Self {
            prefix: prefix_owned,
            separator,
        }
    }

    /// Prefixer using the platform separator / 使用平台路径分隔符
    pub fn platform(prefix: &str) -> Self {
        Self::new(prefix, std::path::MAIN_SEPARATOR)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn prefix_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches(&SEPARATORS[..]))
    }

    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }

    pub fn prefix_directory_path(&self, path: &str) -> String {
        let prefixed = self.prefix_path(path);
        if prefixed.is_empty() || prefixed.ends_with(self.separator) {
            prefixed
        } else {
            format!("{}{}", prefixed, self.separator)
        }
    }
}
