//! 阿里云 OSS 适配器 / Aliyun OSS adapter
//!
//! Plain REST calls signed with the OSS V1 header scheme.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::config::AliyunConfig;
use super::sign::{OssSigner, SignedRequest};
use crate::error::{FilesystemError, Result};
use crate::storage::{
    DirectoryAttributes, FileAttributes, StorageAdapter, StorageAttributes, Visibility,
    WriteOptions,
};
use crate::utils::{concat_path_to_url, encode_key, http_date};

const OSS_ACL_HEADER: &str = "x-oss-object-acl";
const OSS_COPY_SOURCE_HEADER: &str = "x-oss-copy-source";
const LIST_PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_marker: Option<String>,
    #[serde(default)]
    contents: Vec<ObjectSummary>,
    #[serde(default)]
    common_prefixes: Vec<CommonPrefix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectSummary {
    key: String,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefix {
    prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessControlPolicy {
    access_control_list: AccessControlList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessControlList {
    grant: String,
}

fn acl_for(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public-read",
        Visibility::Private => "private",
    }
}

/// `default` inherits the bucket ACL, which is not queried, so it reads as private
/// default 继承 bucket 权限，未查询时按私有处理
fn visibility_for(acl: &str) -> Visibility {
    match acl {
        "public-read" | "public-read-write" => Visibility::Public,
        _ => Visibility::Private,
    }
}

/// ListObjects (V1) query; paging continues from `marker` / 列举参数，按 marker 翻页
fn list_query(
    prefix: &str,
    delimiter: Option<&str>,
    marker: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("prefix", prefix.to_string()),
        ("max-keys", LIST_PAGE_SIZE.to_string()),
    ];
    if let Some(d) = delimiter {
        query.push(("delimiter", d.to_string()));
    }
    if let Some(m) = marker.filter(|m| !m.is_empty()) {
        query.push(("marker", m.to_string()));
    }
    query
}

fn parse_time(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value)
        .or_else(|_| chrono::DateTime::parse_from_rfc2822(value))
        .ok()
        .map(|t| t.timestamp())
}

/// One outbound OSS request / 单个 OSS 请求
struct OssRequest<'a> {
    method: Method,
    key: &'a str,
    sub_resource: Option<&'a str>,
    query: Vec<(&'a str, String)>,
    oss_headers: BTreeMap<String, String>,
    content_type: String,
    body: Option<Bytes>,
}

impl<'a> OssRequest<'a> {
    fn new(method: Method, key: &'a str) -> Self {
        Self {
            method,
            key,
            sub_resource: None,
            query: Vec::new(),
            oss_headers: BTreeMap::new(),
            content_type: String::new(),
            body: None,
        }
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.oss_headers.insert(name.to_string(), value.into());
        self
    }
}

pub struct AliyunAdapter {
    config: AliyunConfig,
    signer: OssSigner,
    client: Client,
}

impl AliyunAdapter {
    pub fn new(config: AliyunConfig) -> Self {
        let signer = OssSigner::new(&config.access_key_id, &config.access_key_secret);
        Self {
            config,
            signer,
            client: Client::new(),
        }
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}://{}.{}",
            self.config.scheme(),
            self.config.bucket,
            self.config.endpoint_host()
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_url(), encode_key(key))
    }

    async fn send(&self, request: OssRequest<'_>) -> Result<Response> {
        let date = http_date(Utc::now());
        let resource = format!(
            "/{}/{}{}",
            self.config.bucket,
            request.key,
            request.sub_resource.map(|s| format!("?{}", s)).unwrap_or_default()
        );
        let authorization = self.signer.authorization(&SignedRequest {
            verb: request.method.as_str(),
            content_md5: "",
            content_type: &request.content_type,
            date: &date,
            oss_headers: &request.oss_headers,
            resource: &resource,
        });

        let mut url = self.object_url(request.key);
        if let Some(sub) = request.sub_resource {
            url = format!("{}?{}", url, sub);
        }

        tracing::debug!("OSS {} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, &url)
            .header("Date", &date)
            .header("Authorization", authorization);
        if !request.content_type.is_empty() {
            builder = builder.header("Content-Type", &request.content_type);
        }
        for (name, value) in &request.oss_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        Ok(builder.send().await?)
    }

    /// Turn a non-2xx response into its status and body text / 非 2xx 响应转为错误描述
    async fn check(response: Response) -> std::result::Result<Response, String> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(format!("{} - {}", status, text))
        }
    }

    async fn head(&self, key: &str) -> Result<Response> {
        self.send(OssRequest::new(Method::HEAD, key)).await
    }

    /// List one page of objects under `prefix` / 列出一页对象
    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        marker: Option<&str>,
    ) -> Result<ListBucketResult> {
        let mut request = OssRequest::new(Method::GET, "");
        request.query = list_query(prefix, delimiter, marker);

        let response = Self::check(self.send(request).await?)
            .await
            .map_err(|reason| FilesystemError::UnableToListContents {
                path: prefix.to_string(),
                reason,
            })?;
        let text = response.text().await?;
        Ok(quick_xml::de::from_str(&text)?)
    }

    async fn list_all(&self, prefix: &str, delimiter: Option<&str>) -> Result<ListBucketResult> {
        let mut all = ListBucketResult {
            is_truncated: false,
            next_marker: None,
            contents: Vec::new(),
            common_prefixes: Vec::new(),
        };
        let mut marker: Option<String> = None;

        loop {
            let page = self.list_page(prefix, delimiter, marker.as_deref()).await?;
            all.contents.extend(page.contents);
            all.common_prefixes.extend(page.common_prefixes);

            match page.next_marker.filter(|m| page.is_truncated && !m.is_empty()) {
                Some(next) => marker = Some(next),
                None => return Ok(all),
            }
        }
    }

    async fn copy_object(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        let copy_source = format!("/{}/{}", self.config.bucket, encode_key(source));
        let mut request =
            OssRequest::new(Method::PUT, destination).header(OSS_COPY_SOURCE_HEADER, copy_source);
        if let Some(v) = options.visibility {
            request = request.header(OSS_ACL_HEADER, acl_for(v));
        }

        Self::check(self.send(request).await?)
            .await
            .map_err(|reason| FilesystemError::UnableToCopyFile {
                source_path: source.to_string(),
                destination: destination.to_string(),
                reason,
            })?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for AliyunAdapter {
    fn name(&self) -> &str {
        "aliyun"
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let response = self.head(path).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(FilesystemError::metadata(path, "existence", s)),
        }
    }

    async fn directory_exists(&self, path: &str) -> Result<bool> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let page = self.list_page(&prefix, Some("/"), None).await?;
        Ok(!page.contents.is_empty() || !page.common_prefixes.is_empty())
    }

    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()> {
        let mut request = OssRequest::new(Method::PUT, path);
        request.content_type = options.mime_type_for(path);
        request.body = Some(contents);
        if let Some(v) = options.visibility {
            request = request.header(OSS_ACL_HEADER, acl_for(v));
        }

        Self::check(self.send(request).await?)
            .await
            .map_err(|reason| FilesystemError::write(path, reason))?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        let response = Self::check(self.send(OssRequest::new(Method::GET, path)).await?)
            .await
            .map_err(|reason| FilesystemError::read(path, reason))?;
        Ok(response.bytes().await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Self::check(self.send(OssRequest::new(Method::DELETE, path)).await?)
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

        for object in listed.contents {
            Self::check(self.send(OssRequest::new(Method::DELETE, &object.key)).await?)
                .await
                .map_err(|reason| FilesystemError::UnableToDeleteDirectory {
                    path: path.to_string(),
                    reason,
                })?;
        }
        // Placeholder object for the directory itself / 删除目录占位对象
        let _ = self.send(OssRequest::new(Method::DELETE, &prefix)).await;
        Ok(())
    }

    async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()> {
        let key = format!("{}/", path.trim_end_matches('/'));
        let mut request = OssRequest::new(Method::PUT, &key);
        request.body = Some(Bytes::new());
        if let Some(v) = options.directory_visibility {
            request = request.header(OSS_ACL_HEADER, acl_for(v));
        }

        Self::check(self.send(request).await?)
            .await
            .map_err(|reason| FilesystemError::UnableToCreateDirectory {
                path: path.to_string(),
                reason,
            })?;
        Ok(())
    }

    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let mut request = OssRequest::new(Method::PUT, path).header(OSS_ACL_HEADER, acl_for(visibility));
        request.sub_resource = Some("acl");

        Self::check(self.send(request).await?)
            .await
            .map_err(|reason| FilesystemError::UnableToSetVisibility {
                path: path.to_string(),
                reason,
            })?;
        Ok(())
    }

    async fn visibility(&self, path: &str) -> Result<FileAttributes> {
        let mut request = OssRequest::new(Method::GET, path);
        request.sub_resource = Some("acl");

        let response = Self::check(self.send(request).await?)
            .await
            .map_err(|reason| FilesystemError::metadata(path, "visibility", reason))?;
        let policy: AccessControlPolicy = quick_xml::de::from_str(&response.text().await?)?;

        Ok(FileAttributes {
            visibility: Some(visibility_for(&policy.access_control_list.grant)),
            ..FileAttributes::new(path)
        })
    }

    async fn metadata(&self, path: &str) -> Result<FileAttributes> {
        let response = Self::check(self.head(path).await?)
            .await
            .map_err(|reason| FilesystemError::metadata(path, "metadata", reason))?;
        let headers = response.headers();
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        Ok(FileAttributes {
            file_size: header("content-length").and_then(|v| v.parse().ok()),
            mime_type: header("content-type").map(str::to_string),
            last_modified: header("last-modified").and_then(parse_time),
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

        let mut entries = Vec::new();
        for cp in listed.common_prefixes {
            entries.push(StorageAttributes::Dir(DirectoryAttributes {
                path: cp.prefix.trim_end_matches('/').to_string(),
                ..Default::default()
            }));
        }
        for object in listed.contents {
            if object.key == prefix {
                continue;
            }
            let last_modified = object.last_modified.as_deref().and_then(parse_time);
            if object.key.ends_with('/') {
                entries.push(StorageAttributes::Dir(DirectoryAttributes {
                    path: object.key.trim_end_matches('/').to_string(),
                    visibility: None,
                    last_modified,
                }));
            } else {
                entries.push(StorageAttributes::File(FileAttributes {
                    file_size: object.size,
                    last_modified,
                    ..FileAttributes::new(object.key)
                }));
            }
        }
        Ok(entries)
    }

    async fn move_file(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        self.copy_object(source, destination, options)
            .await
            .map_err(|e| FilesystemError::UnableToMoveFile {
                source_path: source.to_string(),
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;
        self.delete(source).await
    }

    async fn copy_file(&self, source: &str, destination: &str, options: &WriteOptions) -> Result<()> {
        self.copy_object(source, destination, options).await
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(concat_path_to_url(&self.bucket_url(), &encode_key(path)))
    }
}
