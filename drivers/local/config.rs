//! 本地存储配置 / Local disk configuration

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::storage::Visibility;

/// Local disk configuration / 本地磁盘配置
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// 根目录
    #[serde(default)]
    pub root: String,
    /// Permission overrides / 权限映射
    #[serde(default)]
    pub permissions: PermissionMap,
    /// Default visibility, also used for new directories / 默认可见性
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// `skip` skips symlinks, anything else rejects them / 符号链接策略
    #[serde(default)]
    pub links: Option<String>,
    #[serde(default)]
    pub lock: LockMode,
    /// 访问地址前缀
    #[serde(default)]
    pub url: Option<String>,
}

impl LocalConfig {
    pub fn link_handling(&self) -> LinkHandling {
        match self.links.as_deref() {
            Some("skip") => LinkHandling::Skip,
            _ => LinkHandling::Disallow,
        }
    }
}

/// Symlink policy / 符号链接处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHandling {
    Skip,
    Disallow,
}

/// File lock taken while writing / 写入时的文件锁
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    None,
    Shared,
    #[default]
    Exclusive,
}

impl<'de> Deserialize<'de> for LockMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accepts flock numbers (0, 1 = LOCK_SH, 2 = LOCK_EX) or names / 支持数字或名称
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(LockMode::default()),
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(LockMode::None),
                Some(1) => Ok(LockMode::Shared),
                Some(2) => Ok(LockMode::Exclusive),
                _ => Err(serde::de::Error::custom(format!("invalid lock mode: {}", n))),
            },
            Value::String(s) => match s.as_str() {
                "none" => Ok(LockMode::None),
                "shared" => Ok(LockMode::Shared),
                "exclusive" => Ok(LockMode::Exclusive),
                other => Err(serde::de::Error::custom(format!("invalid lock mode: {}", other))),
            },
            other => Err(serde::de::Error::custom(format!("invalid lock mode: {}", other))),
        }
    }
}

/// `{ "file": {...}, "dir": {...} }` / 文件与目录权限
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionMap {
    #[serde(default)]
    pub file: ModePair,
    #[serde(default)]
    pub dir: ModePair,
}

/// Unix modes per visibility. Integers are raw mode values, strings are
/// parsed as octal (`"0644"`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ModePair {
    #[serde(default, deserialize_with = "deserialize_mode")]
    pub public: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_mode")]
    pub private: Option<u32>,
}

fn deserialize_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(|m| Some(m as u32))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid mode: {}", n))),
        Value::String(s) => {
            let digits = s.trim_start_matches("0o");
            u32::from_str_radix(digits, 8)
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid octal mode: {}", s)))
        }
        other => Err(serde::de::Error::custom(format!("invalid mode: {}", other))),
    }
}
