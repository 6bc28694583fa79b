//! OSS V1 header signature / OSS V1 请求签名

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;

type HmacSha1 = Hmac<Sha1>;

/// Request fields covered by the signature / 参与签名的请求字段
pub struct SignedRequest<'a> {
    pub verb: &'a str,
    pub content_md5: &'a str,
    pub content_type: &'a str,
    pub date: &'a str,
    /// `x-oss-*` headers, lower-cased names / 小写的 x-oss-* 头
    pub oss_headers: &'a BTreeMap<String, String>,
    /// `/<bucket>/<key>` plus sub-resource / 规范化资源
    pub resource: &'a str,
}

#[derive(Clone)]
pub struct OssSigner {
    access_key_id: String,
    access_key_secret: String,
}

impl OssSigner {
    pub fn new(access_key_id: &str, access_key_secret: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            access_key_secret: access_key_secret.to_string(),
        }
    }

    pub fn string_to_sign(request: &SignedRequest<'_>) -> String {
        let headers: String = request
            .oss_headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect();

        format!(
            "{}\n{}\n{}\n{}\n{}{}",
            request.verb,
            request.content_md5,
            request.content_type,
            request.date,
            headers,
            request.resource
        )
    }

    pub fn signature(&self, request: &SignedRequest<'_>) -> String {
        // HMAC accepts keys of any length / HMAC 支持任意长度密钥
        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(Self::string_to_sign(request).as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// `Authorization` header value / Authorization 头
    pub fn authorization(&self, request: &SignedRequest<'_>) -> String {
        format!("OSS {}:{}", self.access_key_id, self.signature(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_sign_with_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("x-oss-meta-author".to_string(), "foo@example.com".to_string());
        headers.insert("x-oss-magic".to_string(), "abracadabra".to_string());
        let request = SignedRequest {
            verb: "PUT",
            content_md5: "ODBGOERFMDMzQTczRUY3NUE3NzA5QzdFNUYzMDQxNEM=",
            content_type: "text/html",
            date: "Thu, 17 Nov 2005 18:49:58 GMT",
            oss_headers: &headers,
            resource: "/oss-example/nelson",
        };

        assert_eq!(
            OssSigner::string_to_sign(&request),
            "PUT\nODBGOERFMDMzQTczRUY3NUE3NzA5QzdFNUYzMDQxNEM=\ntext/html\nThu, 17 Nov 2005 18:49:58 GMT\nx-oss-magic:abracadabra\nx-oss-meta-author:foo@example.com\n/oss-example/nelson"
        );

        let signer = OssSigner::new("44CF9590006BF252F707", "OtxrzxIsfpFjA7SwPzILwy8Bw21TLhquhboDYROV");
        assert_eq!(
            signer.authorization(&request),
            "OSS 44CF9590006BF252F707:fV5fq7DPwNbrrig7nvUSZIVyruI="
        );
    }

    #[test]
    fn test_signature_with_sub_resource() {
        let headers = BTreeMap::new();
        let request = SignedRequest {
            verb: "GET",
            content_md5: "",
            content_type: "",
            date: "Tue, 05 Mar 2024 07:08:09 GMT",
            oss_headers: &headers,
            resource: "/mybucket/a/b.txt?acl",
        };
        let signer = OssSigner::new("id", "secret");
        assert_eq!(signer.signature(&request), "QAqgs0MbAiZkCd5Ybx62Kcho87U=");
    }
}
