//! 七牛鉴权 / Qiniu credentials and tokens

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Upload policy; field order is part of the signed payload / 上传策略
#[derive(Debug, Serialize)]
struct PutPolicy<'a> {
    scope: &'a str,
    deadline: i64,
}

#[derive(Clone)]
pub struct QiniuAuth {
    access_key: String,
    secret_key: String,
}

impl QiniuAuth {
    pub fn new(access_key: &str, secret_key: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// `<ak>:<urlsafe_base64(hmac_sha1(sk, data))>`
    pub fn sign(&self, data: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        format!("{}:{}", self.access_key, URL_SAFE.encode(mac.finalize().into_bytes()))
    }

    /// Sign already-encoded data and append it / 签名并附带数据
    pub fn sign_with_data(&self, data: &str) -> String {
        let encoded = URL_SAFE.encode(data.as_bytes());
        format!("{}:{}", self.sign(encoded.as_bytes()), encoded)
    }

    /// Upload token scoped to `bucket:key` / 上传凭证
    pub fn upload_token(&self, bucket: &str, key: &str, deadline: i64) -> String {
        let scope = format!("{}:{}", bucket, key);
        let policy = PutPolicy {
            scope: &scope,
            deadline,
        };
        let json = serde_json::to_string(&policy).unwrap_or_default();
        self.sign_with_data(&json)
    }

    /// `Authorization` for rs/rsf management calls / 管理凭证
    pub fn management_token(&self, path_and_query: &str, form_body: Option<&[u8]>) -> String {
        let mut data = format!("{}\n", path_and_query).into_bytes();
        if let Some(body) = form_body {
            data.extend_from_slice(body);
        }
        format!("QBox {}", self.sign(&data))
    }

    /// Signed download URL valid until `deadline` / 私有下载地址
    pub fn private_download_url(&self, url: &str, deadline: i64) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        let base = format!("{}{}e={}", url, sep, deadline);
        let token = self.sign(base.as_bytes());
        format!("{}&token={}", base, token)
    }
}

/// `urlsafe_base64("<bucket>:<key>")` / 资源标识
pub fn entry(bucket: &str, key: &str) -> String {
    URL_SAFE.encode(format!("{}:{}", bucket, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_token() {
        let auth = QiniuAuth::new("ak", "sk");
        assert_eq!(
            auth.upload_token("bucket", "a.txt", 1700000000),
            "ak:AdXGliqGtwftbyUd2ZudiMp6vUE=:eyJzY29wZSI6ImJ1Y2tldDphLnR4dCIsImRlYWRsaW5lIjoxNzAwMDAwMDAwfQ=="
        );
    }

    #[test]
    fn test_management_token() {
        let auth = QiniuAuth::new("ak", "sk");
        let path = format!("/stat/{}", entry("bucket", "a.txt"));
        assert_eq!(path, "/stat/YnVja2V0OmEudHh0");
        assert_eq!(auth.management_token(&path, None), "QBox ak:X-1h1R99ay3xUkIaHQ_GBK4JThc=");
        assert_eq!(
            auth.management_token("/list?bucket=bucket&prefix=docs%2F&limit=1000", None),
            "QBox ak:UzUXHz7oIwMuCX59xNQZnSf4yNs="
        );
    }

    #[test]
    fn test_private_download_url() {
        let auth = QiniuAuth::new("ak", "sk");
        assert_eq!(
            auth.private_download_url("http://cdn.example.com/a%20b.txt", 1700000000),
            "http://cdn.example.com/a%20b.txt?e=1700000000&token=ak:nq9ekjFLQurTkCZNxohGNffKCds="
        );
    }

    #[test]
    fn test_entry() {
        assert_eq!(entry("bucket", "dir/a b.txt"), "YnVja2V0OmRpci9hIGIudHh0");
    }
}
