// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将 TCP 流中读取的原始字节解析为强类型的 `Request` 结构体：
//! 1. 请求行（Request-Line）的解析（方法、目标、版本），目标再拆分为解码后的路径与原始查询串。
//! 2. 请求头的提取，查找时大小写不敏感。
//! 3. 请求体原样保留，供表单解析使用。

use bytes::Bytes;
use log::error;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::{exception::Exception, param::*};

/// 表示一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 请求行中的原始目标（含查询串）
    target: String,
    /// 不含查询串、已百分号解码的路径，路由匹配只看这一部分
    path: String,
    /// `?` 之后的原始查询串
    query: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 按出现顺序保存的请求头
    headers: Vec<(String, String)>,
    /// 请求体
    body: Bytes,
}

impl Request {
    /// 以编程方式构造请求，测试和基准测试使用。
    pub fn new(method: HttpRequestMethod, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            target: target.to_string(),
            path,
            query,
            version: HttpVersion::V1_1,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 以 `\r\n\r\n` 切分头部与请求体，头部必须是合法的 UTF-8。
    /// 2. 解析请求行：提取方法、目标和协议版本。
    /// 3. 逐行解析请求头。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 连接 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let (head, body) = match find_subsequence(buffer, HEADER_TERMINATOR) {
            Some(pos) => (&buffer[..pos], &buffer[pos + HEADER_TERMINATOR.len()..]),
            None => (buffer, &buffer[buffer.len()..]),
        };

        let head = match std::str::from_utf8(head) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or_default();
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let method: HttpRequestMethod = parts[0].parse().map_err(|e| {
            error!("[ID{}]不支持的HTTP请求方法：{}", id, parts[0]);
            e
        })?;
        let version: HttpVersion = parts[2].parse().map_err(|e| {
            error!("[ID{}]不支持的HTTP协议版本：{}", id, parts[2]);
            e
        })?;

        let target = parts[1].to_string();
        let (path, query) = split_target(&target);

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            method,
            target,
            path,
            query,
            version,
            headers,
            body: Bytes::copy_from_slice(body),
        })
    }
}

impl Request {
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 获取请求路径（不含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取请求行中的原始目标（含查询参数）
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn raw_query(&self) -> &str {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 按名称查找请求头，名称大小写不敏感，返回第一个匹配值
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }

    /// 查询串中第一个名为 `key` 的参数（已完成百分号解码）
    pub fn query_value(&self, key: &str) -> Option<String> {
        form_value(self.query.as_bytes(), key)
    }

    /// `application/x-www-form-urlencoded` 请求体中名为 `key` 的字段
    pub fn form_value(&self, key: &str) -> Option<String> {
        let is_form = self
            .header("Content-Type")
            .map_or(false, |t| t.starts_with("application/x-www-form-urlencoded"));
        if !is_form {
            return None;
        }
        form_value(&self.body, key)
    }
}

fn form_value(input: &[u8], key: &str) -> Option<String> {
    form_urlencoded::parse(input)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// 拆分请求目标。路径部分完成百分号解码，查询串保持原样，取值时再解码。
fn split_target(target: &str) -> (String, String) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let path = percent_decode_str(path).decode_utf8_lossy().into_owned();
    (path, query.to_string())
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_request() {
        let request_str = "GET /user/42 HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.path(), "/user/42");
        assert_eq!(request.version(), HttpVersion::V1_1);
        assert_eq!(request.user_agent(), "Test-Browser");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_every_registrable_method() {
        for (name, method) in [
            ("PUT", HttpRequestMethod::Put),
            ("DELETE", HttpRequestMethod::Delete),
            ("PATCH", HttpRequestMethod::Patch),
            ("OPTIONS", HttpRequestMethod::Options),
        ] {
            let request_str = format!("{} /resource HTTP/1.1\r\nHost: localhost\r\n\r\n", name);
            let request = Request::try_from(request_str.as_bytes(), 0).unwrap();
            assert_eq!(request.method(), method);
        }
    }

    #[test]
    fn test_parse_post_request_keeps_body() {
        let request_str = "POST /submit HTTP/1.1\r\nHost: localhost:7878\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 20\r\n\r\nname=ko&note=a%20b+c";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Post);
        assert_eq!(request.body().len(), 20);
        assert_eq!(request.form_value("name").as_deref(), Some("ko"));
        assert_eq!(request.form_value("note").as_deref(), Some("a b c"));
        assert_eq!(request.form_value("missing"), None);
    }

    #[test]
    fn test_form_value_requires_form_content_type() {
        let request = Request::new(HttpRequestMethod::Post, "/submit")
            .with_header("Content-Type", "application/json")
            .with_body("name=ko");
        assert_eq!(request.form_value("name"), None);
    }

    #[test]
    fn test_unsupported_method() {
        let request_str = "TRACE /resource HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes(), 0);
        assert_eq!(result.unwrap_err(), Exception::UnSupportedRequestMethod);
    }

    #[test]
    fn test_unsupported_http_version() {
        let request_str = "GET / HTTP/2.0\r\nHost: localhost:7878\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes(), 0);
        assert_eq!(result.unwrap_err(), Exception::UnsupportedHttpVersion);
    }

    #[test]
    fn test_http_1_0_accepted() {
        let request = Request::try_from(b"GET / HTTP/1.0\r\n\r\n", 0).unwrap();
        assert_eq!(request.version(), HttpVersion::V1_0);
    }

    #[test]
    fn test_malformed_request_line() {
        let result = Request::try_from(b"GET\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::MalformedRequestLine);
    }

    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];
        let result = Request::try_from(&buffer, 0);
        assert_eq!(result.unwrap_err(), Exception::RequestIsNotUtf8);
    }

    #[test]
    fn test_binary_body_is_not_utf8_checked() {
        let mut buffer = b"POST /upload HTTP/1.1\r\nContent-Length: 3\r\n\r\n".to_vec();
        buffer.extend_from_slice(&[0xFF, 0x00, 0xFE]);
        let request = Request::try_from(&buffer, 0).unwrap();
        assert_eq!(request.body().as_ref(), &[0xFF, 0x00, 0xFE]);
    }

    #[test]
    fn test_case_insensitive_headers() {
        let request_str = "GET / HTTP/1.1\r\nhost: localhost:7878\r\nuser-agent: Test\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.user_agent(), "Test");
        assert_eq!(request.header("HOST"), Some("localhost:7878"));
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let request_str = "GET /files/my%20file%E4%B8%AD.txt?q=a%20b HTTP/1.1\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.path(), "/files/my file中.txt");
        assert_eq!(request.target(), "/files/my%20file%E4%B8%AD.txt?q=a%20b");
        assert_eq!(request.raw_query(), "q=a%20b");

        let request = Request::new(HttpRequestMethod::Get, "/user/a%20b");
        assert_eq!(request.path(), "/user/a b");
    }

    #[test]
    fn test_path_with_query_string() {
        let request_str = "GET /page?id=123&name=te%2Fst HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.path(), "/page");
        assert_eq!(request.target(), "/page?id=123&name=te%2Fst");
        assert_eq!(request.raw_query(), "id=123&name=te%2Fst");
        assert_eq!(request.query_value("id").as_deref(), Some("123"));
        assert_eq!(request.query_value("name").as_deref(), Some("te/st"));
        assert_eq!(request.query_value("nope"), None);
    }

    #[test]
    fn test_lowercase_method() {
        let request = Request::try_from(b"get / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n", 0).unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Get);
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"ab\r\n\r\ncd", HEADER_TERMINATOR), Some(2));
        assert_eq!(find_subsequence(b"abcd", HEADER_TERMINATOR), None);
    }
}
