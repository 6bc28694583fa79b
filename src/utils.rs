/// Path and URL helper functions / 路径与 URL 工具函数

/// Join a directory and a file name into a storage key / 拼接目录与文件名
/// Leading and trailing `/` are trimmed from the result / 去掉首尾的 `/`
pub fn join_key(directory: &str, name: &str) -> String {
    format!("{}/{}", directory, name).trim_matches('/').to_string()
}

/// Concatenate base URL and path with exactly one `/` between them / 拼接 URL 与路径
pub fn concat_path_to_url(url: &str, path: &str) -> String {
    format!("{}/{}", url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Prepend a scheme when the host has none / 为缺少协议的主机名补全协议
pub fn ensure_scheme(host: &str, scheme: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("{}://{}", scheme, host)
    }
}

/// Percent-encode each `/`-separated segment of a key / 逐段 URL 编码
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Get file extension (lowercase) / 获取文件扩展名
pub fn get_ext(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// RFC 1123 date for HTTP headers / HTTP 头使用的 GMT 时间
pub fn http_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("avatars", "a.png"), "avatars/a.png");
        assert_eq!(join_key("", "a.png"), "a.png");
        assert_eq!(join_key("/avatars/", "a.png"), "avatars//a.png");
        assert_eq!(join_key("avatars", ""), "avatars");
    }

    #[test]
    fn test_concat_path_to_url() {
        let expected = "http://cdn.example.com/a/b.txt";
        assert_eq!(concat_path_to_url("http://cdn.example.com/", "a/b.txt"), expected);
        assert_eq!(concat_path_to_url("http://cdn.example.com", "/a/b.txt"), expected);
        assert_eq!(concat_path_to_url("http://cdn.example.com//", "//a/b.txt"), expected);
        assert_eq!(concat_path_to_url("http://cdn.example.com", "a/b.txt"), expected);
    }

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("cdn.example.com", "http"), "http://cdn.example.com");
        assert_eq!(ensure_scheme("https://cdn.example.com", "http"), "https://cdn.example.com");
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("a b/中.txt"), "a%20b/%E4%B8%AD.txt");
        assert_eq!(encode_key("plain/key.txt"), "plain/key.txt");
    }

    #[test]
    fn test_http_date() {
        let at = chrono::DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(http_date(at), "Tue, 05 Mar 2024 07:08:09 GMT");
    }
}
