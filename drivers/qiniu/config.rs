//! 七牛云 Kodo 配置 / Qiniu Kodo configuration

use serde::Deserialize;

fn default_upload_host() -> String {
    "https://upload.qiniup.com".to_string()
}

fn default_rs_host() -> String {
    "https://rs.qiniuapi.com".to_string()
}

fn default_rsf_host() -> String {
    "https://rsf.qiniuapi.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QiniuConfig {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Bound download domain / 绑定的下载域名
    pub domain: String,
    /// Upload endpoint of the bucket's region / 上传地址
    #[serde(default = "default_upload_host")]
    pub upload_host: String,
    #[serde(default = "default_rs_host")]
    pub rs_host: String,
    #[serde(default = "default_rsf_host")]
    pub rsf_host: String,
    /// Reads go through signed download URLs / 私有空间，读取时使用签名地址
    #[serde(default)]
    pub private: bool,
}
