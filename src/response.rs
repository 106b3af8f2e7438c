//! 适配层的响应构建器：实现核心的 `ResponseSink`，最终序列化为 HTTP/1.1 报文。

use chrono::prelude::*;
use log::error;

use crate::dispatch::ResponseSink;
use crate::param::{CRLF, SERVER_NAME, STATUS_CODES};
use crate::request::HttpVersion;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    version: HttpVersion,
    status_code: u16,
    information: String,
    date: DateTime<Utc>,
    server_name: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    headonly: bool,
    ended: bool,
}

impl HttpResponse {
    pub fn new(headonly: bool) -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            headonly,
            ended: false,
        }
    }

    /// 适配层自用的快捷构造：状态码加一行纯文本响应体。
    pub fn from_status_code(code: u16, headonly: bool) -> Self {
        let mut response = Self::new(headonly);
        response.set_code(code);
        let text = format!("{} {}", response.status_code, response.information);
        response
            .headers
            .push(("content-type".to_string(), "text/plain".to_string()));
        response.body = text.into_bytes();
        response.ended = true;
        response
    }

    fn set_code(&mut self, code: u16) {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&information) => information.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                panic!();
            }
        };
    }

    /// 序列化为完整的 HTTP/1.1 报文字节。HEAD 请求只序列化头部。
    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let content_length: &str = &self.body.len().to_string();
        let date: &str = &format_date(&self.date);
        let server: &str = &self.server_name;

        let mut extra_headers = String::new();
        for (name, value) in &self.headers {
            extra_headers.push_str(&[name, ": ", value, CRLF].concat());
        }

        let header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            extra_headers.as_str(),
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            server,
            CRLF,
            CRLF,
        ]
        .concat();

        if self.headonly {
            header.into_bytes()
        } else {
            [header.as_bytes(), self.body.as_slice()].concat()
        }
    }
}

impl HttpResponse {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl ResponseSink for HttpResponse {
    fn set_status(&mut self, code: u16) {
        self.set_code(code);
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write(&mut self, bytes: &[u8]) {
        // HEAD 请求也累积响应体，Content-Length 据此计算，序列化时再丢弃
        self.body.extend_from_slice(bytes);
    }

    fn end(&mut self) {
        self.ended = true;
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
