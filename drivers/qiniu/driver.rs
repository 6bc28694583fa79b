//! 七牛云 Kodo 适配器 / Qiniu Kodo adapter
//!
//! Form uploads plus the rs/rsf management APIs.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::Deserialize;

use super::auth::{entry, QiniuAuth};
use super::config::QiniuConfig;
use crate::error::{FilesystemError, Result};
use crate::storage::{
    DirectoryAttributes, FileAttributes, StorageAdapter, StorageAttributes, Visibility,
    WriteOptions,
};
use crate::utils::{concat_path_to_url, encode_key, ensure_scheme};

/// Token lifetime in seconds / 凭证有效期（秒）
const TOKEN_TTL: i64 = 3600;
const LIST_LIMIT: u32 = 1000;
/// rs status for a missing object / 资源不存在
const NO_SUCH_ENTRY: u16 = 612;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatResult {
    fsize: u64,
    #[serde(default)]
    mime_type: Option<String>,
    /// 100ns units / 单位为 100 纳秒
    put_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResult {
    #[serde(default)]
    marker: Option<String>,
    #[serde(default)]
    common_prefixes: Vec<String>,
    #[serde(default)]
    items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    key: String,
    #[serde(default)]
    fsize: u64,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    put_time: i64,
}

fn put_time_secs(put_time: i64) -> i64 {
    put_time / 10_000_000
}

pub struct QiniuAdapter {
    config: QiniuConfig,
    auth: QiniuAuth,
    client: Client,
}

impl QiniuAdapter {
    pub fn new(config: QiniuConfig) -> Self {
        let auth = QiniuAuth::new(&config.access_key, &config.secret_key);
        Self {
            config,
            auth,
            client: Client::new(),
        }
    }

    /// Download URL on the bound domain / 绑定域名下的访问地址
    pub fn url(&self, path: &str) -> String {
        concat_path_to_url(
            &ensure_scheme(&self.config.domain, "http"),
            &encode_key(path.trim_start_matches('/')),
        )
    }

    fn download_url(&self, path: &str) -> String {
        let url = self.url(path);
        if self.config.private {
            self.auth
                .private_download_url(&url, Utc::now().timestamp() + TOKEN_TTL)
        } else {
            url
        }
    }

    fn entry(&self, key: &str) -> String {
        entry(&self.config.bucket, key)
    }

    /// POST a management command to rs / 调用 rs 管理接口
    async fn rs(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.config.rs_host.trim_end_matches('/'), path);
        tracing::debug!("Qiniu rs {}", path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth.management_token(path, None))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await?;
        Ok(response)
    }

    async fn check(response: Response) -> std::result::Result<Response, String> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(format!("{} - {}", status, text))
        }
    }

    async fn stat(&self, path: &str) -> Result<Option<StatResult>> {
        let response = self.rs(&format!("/stat/{}", self.entry(path))).await?;
        if response.status().as_u16() == NO_SUCH_ENTRY {
            return Ok(None);
        }
        let response = Self::check(response)
            .await
            .map_err(|reason| FilesystemError::metadata(path, "metadata", reason))?;
        Ok(Some(response.json().await?))
    }

    fn list_query(&self, prefix: &str, delimiter: Option<&str>, marker: Option<&str>, limit: u32) -> String {
        let mut query = format!(
            "/list?bucket={}&prefix={}",
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(prefix)
        );
        if let Some(d) = delimiter {
            query.push_str(&format!("&delimiter={}", urlencoding::encode(d)));
        }
        if let Some(m) = marker.filter(|m| !m.is_empty()) {
            query.push_str(&format!("&marker={}", urlencoding::encode(m)));
        }
        query.push_str(&format!("&limit={}", limit));
        query
    }

    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        marker: Option<&str>,
        limit: u32,
    ) -> Result<ListResult> {
        let path_and_query = self.list_query(prefix, delimiter, marker, limit);
        let url = format!("{}{}", self.config.rsf_host.trim_end_matches('/'), path_and_query);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth.management_token(&path_and_query, None))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await?;
        let response = Self::check(response)
            .await
            .map_err(|reason| FilesystemError::UnableToListContents {
                path: prefix.to_string(),
                reason,
            })?;
        Ok(response.json().await?)
    }

    async fn list_all(&self, prefix: &str, delimiter: Option<&str>) -> Result<ListResult> {
        let mut all = ListResult {
            marker: None,
            common_prefixes: Vec::new(),
            items: Vec::new(),
        };
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .list_page(prefix, delimiter, marker.as_deref(), LIST_LIMIT)
                .await?;
            all.items.extend(page.items);
            all.common_prefixes.extend(page.common_prefixes);

            match page.marker.filter(|m| !m.is_empty()) {
                Some(next) => marker = Some(next),
                None => return Ok(all),
            }
        }
    }

    /// copy / move share the same URL shape / 复制与移动
    async fn transfer(&self, op: &str, source: &str, destination: &str) -> std::result::Result<(), String> {
        let path = format!(
            "/{}/{}/{}/force/true",
            op,
            self.entry(source),
            self.entry(destination)
        );
        let response = self.rs(&path).await.map_err(|e| e.to_string())?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for QiniuAdapter {
    fn name(&self) -> &str {
        "qiniu"
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }

    async fn directory_exists(&self, path: &str) -> Result<bool> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let page = self.list_page(&prefix, None, None, 1).await?;
        Ok(!page.items.is_empty())
    }

    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()> {
        let token = self.auth.upload_token(
            &self.config.bucket,
            path,
            Utc::now().timestamp() + TOKEN_TTL,
        );
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let part = reqwest::multipart::Part::bytes(contents.to_vec())
            .file_name(file_name)
            .mime_str(&options.mime_type_for(path))
            .map_err(|e| FilesystemError::write(path, e))?;
        let form = reqwest::multipart::Form::new()
            .text("token", token)
            .text("key", path.to_string())
            .part("file", part);

        tracing::debug!("Qiniu upload {} to {}", path, self.config.upload_host);
        let response = self
            .client
            .post(ensure_scheme(&self.config.upload_host, "https"))
            .multipart(form)
            .send()
            .await?;
        Self::check(response)
            .await
            .map_err(|reason| FilesystemError::write(path, reason))?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        let response = self.client.get(self.download_url(path)).send().await?;
        let response = Self::check(response)
            .await
            .map_err(|reason| FilesystemError::read(path, reason))?;
        Ok(response.bytes().await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self.rs(&format!("/delete/{}", self.entry(path))).await?;
        if response.status().as_u16() == NO_SUCH_ENTRY {
            return Ok(());
        }
        Self::check(response)
            .await
            .map_err(|reason| FilesystemError::UnableToDeleteFile {
                path: path.to_string(),
                reason,
            })?;
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let listed = self.list_all(&prefix, None).await?;
        for item in listed.items {
            self.delete(&item.key)
                .await
                .map_err(|e| FilesystemError::UnableToDeleteDirectory {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()> {
        let key = format!("{}/", path.trim_end_matches('/'));
        self.write(&key, Bytes::new(), options)
            .await
            .map_err(|e| FilesystemError::UnableToCreateDirectory {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn set_visibility(&self, path: &str, _visibility: Visibility) -> Result<()> {
        Err(FilesystemError::UnableToSetVisibility {
            path: path.to_string(),
            reason: "Qiniu buckets do not support per-object visibility".to_string(),
        })
    }

    async fn visibility(&self, path: &str) -> Result<FileAttributes> {
        Ok(FileAttributes {
            visibility: Some(Visibility::Public),
            ..FileAttributes::new(path)
        })
    }

    async fn metadata(&self, path: &str) -> Result<FileAttributes> {
        let stat = self
            .stat(path)
            .await?
            .ok_or_else(|| FilesystemError::metadata(path, "metadata", "no such file or directory"))?;
        Ok(FileAttributes {
            file_size: Some(stat.fsize),
            mime_type: stat.mime_type,
            last_modified: Some(put_time_secs(stat.put_time)),
            ..FileAttributes::new(path)
        })
    }

    async fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let listed = self
            .list_all(&prefix, if deep { None } else { Some("/") })
            .await?;

        let mut entries: Vec<StorageAttributes> = listed
            .common_prefixes
            .into_iter()
            .map(|p| {
                StorageAttributes::Dir(DirectoryAttributes {
                    path: p.trim_end_matches('/').to_string(),
                    ..Default::default()
                })
            })
            .collect();
        for item in listed.items {
            if item.key == prefix {
                continue;
            }
            if item.key.ends_with('/') {
                entries.push(StorageAttributes::Dir(DirectoryAttributes {
                    path: item.key.trim_end_matches('/').to_string(),
                    visibility: None,
                    last_modified: Some(put_time_secs(item.put_time)),
                }));
            } else {
                entries.push(StorageAttributes::File(FileAttributes {
                    file_size: Some(item.fsize),
                    mime_type: item.mime_type,
                    last_modified: Some(put_time_secs(item.put_time)),
                    ..FileAttributes::new(item.key)
                }));
            }
        }
        Ok(entries)
    }

    async fn move_file(&self, source: &str, destination: &str, _options: &WriteOptions) -> Result<()> {
        self.transfer("move", source, destination)
            .await
            .map_err(|reason| FilesystemError::UnableToMoveFile {
                source_path: source.to_string(),
                destination: destination.to_string(),
                reason,
            })
    }

    async fn copy_file(&self, source: &str, destination: &str, _options: &WriteOptions) -> Result<()> {
        self.transfer("copy", source, destination)
            .await
            .map_err(|reason| FilesystemError::UnableToCopyFile {
                source_path: source.to_string(),
                destination: destination.to_string(),
                reason,
            })
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(self.url(path))
    }
}
