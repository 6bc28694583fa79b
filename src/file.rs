//! Source file handle for uploads / 上传源文件
//!
//! A thin wrapper around a real filesystem path that knows how to derive a
//! storage name from its own contents.

use sha1::{Digest, Sha1};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::utils::get_ext;

/// How `put_file` names the stored object / 存储文件命名规则
#[derive(Clone, Default)]
pub enum NamingRule {
    /// `YYYYMMDD/<md5(time + path)>` / 按日期分目录
    #[default]
    Date,
    /// `<md5[0..2]>/<md5[2..]>` of the file contents / 内容 MD5 分片
    Md5,
    /// `<sha1[0..2]>/<sha1[2..]>` of the file contents / 内容 SHA1 分片
    Sha1,
    /// Caller supplied name (without extension) / 自定义命名
    Custom(Arc<dyn Fn(&UploadedFile) -> String + Send + Sync>),
}

impl fmt::Debug for NamingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingRule::Date => f.write_str("Date"),
            NamingRule::Md5 => f.write_str("Md5"),
            NamingRule::Sha1 => f.write_str("Sha1"),
            NamingRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl std::str::FromStr for NamingRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "date" | "" => Ok(NamingRule::Date),
            "md5" => Ok(NamingRule::Md5),
            "sha1" => Ok(NamingRule::Sha1),
            other => Err(format!("unknown naming rule: {}", other)),
        }
    }
}

/// A file on local disk about to be stored / 待存储的本地文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    path: PathBuf,
    original_name: Option<String>,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            original_name: None,
        }
    }

    /// Keep the client-side name; its extension wins over the temp path's
    /// 保留客户端原始文件名
    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn real_path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn extension(&self) -> String {
        match &self.original_name {
            Some(name) => get_ext(name),
            None => get_ext(&self.path.to_string_lossy()),
        }
    }

    pub fn md5(&self) -> Result<String> {
        let mut ctx = md5::Context::new();
        self.digest_with(|chunk| ctx.consume(chunk))?;
        Ok(format!("{:x}", ctx.compute()))
    }

    pub fn sha1(&self) -> Result<String> {
        let mut hasher = Sha1::new();
        self.digest_with(|chunk| hasher.update(chunk))?;
        Ok(hex::encode(hasher.finalize()))
    }

    fn digest_with(&self, mut consume: impl FnMut(&[u8])) -> Result<()> {
        let mut file = std::fs::File::open(&self.path)?;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            consume(&buf[..n]);
        }
    }

    /// Storage name derived from `rule`, extension appended / 按规则生成存储文件名
    pub fn hash_name(&self, rule: &NamingRule) -> Result<String> {
        let stem = match rule {
            NamingRule::Date => {
                let now = chrono::Local::now();
                let seed = format!(
                    "{}{}",
                    now.timestamp_micros() as f64 / 1_000_000.0,
                    self.path.to_string_lossy()
                );
                format!("{}/{:x}", now.format("%Y%m%d"), md5::compute(seed))
            }
            NamingRule::Md5 => shard(&self.md5()?),
            NamingRule::Sha1 => shard(&self.sha1()?),
            NamingRule::Custom(f) => f(self),
        };

        let ext = self.extension();
        if ext.is_empty() {
            Ok(stem)
        } else {
            Ok(format!("{}.{}", stem, ext))
        }
    }
}

fn shard(hash: &str) -> String {
    format!("{}/{}", &hash[..2], &hash[2..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8], suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_content_hashes() {
        let file = temp_file(b"hello", ".txt");
        let uploaded = UploadedFile::new(file.path());
        assert_eq!(uploaded.md5().unwrap(), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(uploaded.sha1().unwrap(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn test_hash_name_md5_and_sha1() {
        let file = temp_file(b"hello", ".TXT");
        let uploaded = UploadedFile::new(file.path());
        assert_eq!(
            uploaded.hash_name(&NamingRule::Md5).unwrap(),
            "5d/41402abc4b2a76b9719d911017c592.txt"
        );
        assert_eq!(
            uploaded.hash_name(&NamingRule::Sha1).unwrap(),
            "aa/f4c61ddcc5e8a2dabede0f3b482cd9aea9434d.txt"
        );
    }

    #[test]
    fn test_hash_name_date() {
        let file = temp_file(b"x", ".bin");
        let name = UploadedFile::new(file.path())
            .with_original_name("photo.JPG")
            .hash_name(&NamingRule::Date)
            .unwrap();
        let (day, rest) = name.split_once('/').unwrap();
        assert_eq!(day.len(), 8);
        assert!(day.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest.len(), 32 + ".jpg".len());
        assert!(rest.ends_with(".jpg"));
    }

    #[test]
    fn test_hash_name_custom_without_extension() {
        let file = temp_file(b"x", "");
        let rule = NamingRule::Custom(Arc::new(|_| "fixed".to_string()));
        assert_eq!(UploadedFile::new(file.path()).hash_name(&rule).unwrap(), "fixed");
    }

    #[test]
    fn test_naming_rule_from_str() {
        assert!(matches!("md5".parse::<NamingRule>(), Ok(NamingRule::Md5)));
        assert!(matches!("date".parse::<NamingRule>(), Ok(NamingRule::Date)));
        assert!("crc32".parse::<NamingRule>().is_err());
    }
}
