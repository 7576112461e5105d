use bytes::{Bytes, BytesMut};
use chrono::prelude::*;
use log::warn;

use crate::param::*;

/// 处理器链在单次请求中逐步填充的响应。
///
/// 状态码与头部可以被多次覆盖，响应体只追加，最终由 [`Response::as_bytes`] 序列化。
#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    headers: Vec<(String, String)>,
    content: BytesMut,
    date: DateTime<Utc>,
    server_name: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            headers: Vec::new(),
            content: BytesMut::new(),
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
        }
    }

    /// 仅带状态码和纯文本说明的响应，服务器在请求进入处理器链之前出错时使用。
    pub fn from_status_code(code: u16) -> Self {
        let mut response = Self::new();
        response.set_code(code);
        response.set_header("Content-Type", "text/plain");
        let body = format!("{} {}", code, reason_phrase(code));
        response.write(body.trim_end().as_bytes());
        response
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = reason_phrase(code).to_string();
        if self.information.is_empty() {
            warn!("未登记的状态码：{}", code);
        }
        self
    }

    /// 设置头部，已存在的同名头部（大小写不敏感）会被替换
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn write(&mut self, data: &[u8]) -> &mut Self {
        self.content.extend_from_slice(data);
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        for (name, value) in &self.headers {
            head.push_str(&[name.as_str(), ": ", value.as_str(), CRLF].concat());
        }
        head.push_str(&["Content-Length: ", &self.content.len().to_string(), CRLF].concat());
        head.push_str(&["Date: ", &format_date(&self.date), CRLF].concat());
        head.push_str(&["Server: ", &self.server_name, CRLF].concat());
        head.push_str(&["Connection: close", CRLF].concat());
        head.push_str(CRLF);

        [head.as_bytes(), &self.content[..]].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> Bytes {
        self.content.clone().freeze()
    }

    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
