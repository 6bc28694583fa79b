//! Application configuration module / 应用配置模块
//!
//! Configuration is a JSON document read from `config.json`; values are looked
//! up with dotted keys such as `filesystem.disks.local.root`.
//! Creates a default config file on first run / 首次运行时创建默认配置文件

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Dotted-key view over a JSON document / 支持点号路径查询的配置仓库
#[derive(Debug, Clone, Default)]
pub struct ConfigRepository {
    root: Value,
}

impl ConfigRepository {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Look up a dotted key; `None` when any segment is missing
    /// 按点号路径查找，任一段不存在返回 None
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.root, key)
    }

    /// Look up a dotted key, falling back to `default` / 查找失败时返回默认值
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    pub fn all(&self) -> &Value {
        &self.root
    }
}

/// Walk `value` along a dotted key / 沿点号路径查找
/// An empty key returns `value` itself / 空路径返回自身
pub fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return Some(value);
    }
    key.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
        .filter(|v| !v.is_null())
}

/// Default configuration: one local disk under `storage/`
/// 默认配置：一个位于 storage/ 的本地磁盘
pub fn default_config() -> Value {
    json!({
        "filesystem": {
            "default": "local",
            "disks": {
                "local": {
                    "type": "local",
                    "root": "storage"
                },
                "public": {
                    "type": "local",
                    "root": "storage/public",
                    "visibility": "public",
                    "url": "http://localhost/storage"
                }
            }
        }
    })
}

/// Get the default config file path / 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<ConfigRepository, String> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let root: Value = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(ConfigRepository::new(root))
    } else {
        let root = default_config();
        save_config(path, &root)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(ConfigRepository::new(root))
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: &Path, root: &Value) -> Result<(), String> {
    let content = serde_json::to_string_pretty(root)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_lookup() {
        let repo = ConfigRepository::new(json!({
            "filesystem": { "default": "local", "disks": { "local": { "root": "/data" } } }
        }));
        assert_eq!(repo.get("filesystem.default"), Some(&json!("local")));
        assert_eq!(repo.get("filesystem.disks.local.root"), Some(&json!("/data")));
        assert_eq!(repo.get("filesystem.disks.oss"), None);
        assert_eq!(repo.get("filesystem.default.deeper"), None);
        assert_eq!(repo.get_or("filesystem.missing", json!(5)), json!(5));
    }

    #[test]
    fn test_null_is_absent() {
        let repo = ConfigRepository::new(json!({ "a": { "b": null } }));
        assert_eq!(repo.get("a.b"), None);
        assert_eq!(repo.get_or("a.b", json!("x")), json!("x"));
    }

    #[test]
    fn test_load_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let repo = load_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(repo.get("filesystem.default"), Some(&json!("local")));

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.all(), repo.all());
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_config(&path).unwrap_err().contains("Failed to parse"));
    }
}
