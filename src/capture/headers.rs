use std::collections::BTreeMap;

/// 从 `curl -v` 的诊断输出中解析响应头
///
/// 只看以 `< ` 开头的行；每遇到一个 `< HTTP/` 状态行就重新开始，
/// 所以跟随重定向时留下的是最后一个响应的 header。
pub fn parse_headers(diagnostic: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    for line in diagnostic.lines() {
        let Some(rest) = line.strip_prefix("< ") else {
            continue;
        };
        if rest.starts_with("HTTP/") {
            headers.clear();
            continue;
        }
        if let Some((key, value)) = rest.split_once(':') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            headers.insert(key.to_string(), value.trim().to_string());
        }
    }

    headers
}

/// 忽略大小写查找 header
pub fn find_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERBOSE: &str = "* Connected to example.com\r\n\
> GET / HTTP/1.1\r\n\
> Host: example.com\r\n\
< HTTP/1.1 301 Moved Permanently\r\n\
< Location: https://example.com/\r\n\
< \r\n\
* Issue another request\r\n\
< HTTP/2 200\r\n\
< content-type: application/json\r\n\
< x-trace-id: abc:def\r\n\
< \r\n";

    #[test]
    fn test_parse_headers_final_response_wins() {
        let headers = parse_headers(VERBOSE);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert!(!headers.contains_key("Location"));
        assert!(!headers.contains_key("Host"));
    }

    #[test]
    fn test_first_colon_splits() {
        let headers = parse_headers(VERBOSE);
        assert_eq!(headers.get("x-trace-id").unwrap(), "abc:def");
    }

    #[test]
    fn test_find_header_is_case_insensitive() {
        let headers = parse_headers(VERBOSE);
        assert_eq!(find_header(&headers, "Content-Type"), Some("application/json"));
        assert_eq!(find_header(&headers, "x-missing"), None);
    }

    #[test]
    fn test_empty_diagnostic() {
        assert!(parse_headers("").is_empty());
    }
}
