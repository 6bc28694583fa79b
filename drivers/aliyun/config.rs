//! 阿里云 OSS 配置 / Aliyun OSS configuration

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliyunConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Region endpoint, e.g. `oss-cn-hangzhou.aliyuncs.com` / 地域节点
    pub endpoint: String,
    pub bucket: String,
    /// Custom (CDN) domain / 自定义域名
    #[serde(default)]
    pub domain: Option<String>,
}

impl AliyunConfig {
    /// Endpoint without scheme / 去掉协议的节点地址
    pub fn endpoint_host(&self) -> &str {
        self.endpoint
            .split_once("://")
            .map(|(_, host)| host)
            .unwrap_or(&self.endpoint)
            .trim_end_matches('/')
    }

    /// Scheme from the endpoint, `https` if none / 节点协议，默认 https
    pub fn scheme(&self) -> &str {
        self.endpoint
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("https")
    }

    /// Public URL base: custom domain, else `<bucket>.<endpoint>`
    /// 公开访问域名：优先自定义域名，否则为 bucket.endpoint
    pub fn public_url_base(&self) -> String {
        match self.domain.as_deref() {
            Some(domain) if !domain.is_empty() => domain.to_string(),
            _ => format!("{}.{}", self.bucket, self.endpoint_host()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(domain: Option<&str>) -> AliyunConfig {
        serde_json::from_value(json!({
            "accessKeyId": "id",
            "accessKeySecret": "secret",
            "endpoint": "oss-cn.example.com",
            "bucket": "mybucket",
            "domain": domain,
        }))
        .unwrap()
    }

    #[test]
    fn test_public_url_base_from_bucket_and_endpoint() {
        assert_eq!(config(None).public_url_base(), "mybucket.oss-cn.example.com");
        assert_eq!(config(Some("")).public_url_base(), "mybucket.oss-cn.example.com");
    }

    #[test]
    fn test_public_url_base_from_domain() {
        assert_eq!(config(Some("cdn.example.com")).public_url_base(), "cdn.example.com");
    }

    #[test]
    fn test_endpoint_scheme() {
        let mut cfg = config(None);
        assert_eq!(cfg.scheme(), "https");
        cfg.endpoint = "http://oss-cn.example.com/".to_string();
        assert_eq!(cfg.scheme(), "http");
        assert_eq!(cfg.endpoint_host(), "oss-cn.example.com");
        assert_eq!(cfg.public_url_base(), "mybucket.oss-cn.example.com");
    }

    #[test]
    fn test_missing_bucket_is_error() {
        let parsed = serde_json::from_value::<AliyunConfig>(json!({
            "accessKeyId": "id",
            "accessKeySecret": "secret",
            "endpoint": "oss-cn.example.com"
        }));
        assert!(parsed.is_err());
    }
}
