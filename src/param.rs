// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 全局参数与常量模块
//!
//! 该模块定义了 `webroot` 各组件共享的常量和静态表，包括：
//! - 默认的文件后缀名到 MIME 类型映射表（缓冲白名单的数据来源）。
//! - 静态资源服务会用到的 HTTP 状态码及其原因短语。
//! - 目录列表页模板等随库分发的内置资源。

use std::collections::HashMap;
use lazy_static::lazy_static;

/// 产品标识，用于响应头的 `Server` 字段以及列表页的 `{comment}` 注释
pub const SERVER_NAME: &str = "shaneyale-webroot";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 目录扫描的最大递归深度。
///
/// 源目录中出现符号链接环时，无界递归会耗尽栈空间，
/// 超过该深度的扫描直接判定为构建失败。
pub const MAX_WALK_DEPTH: usize = 32;

/// 内置的目录列表页模板，包含 `{url}`、`{back}`、`{lists}`、`{comment}` 四个占位符。
///
/// 当配置未指定自定义模板（或指定的模板不可读）时使用该内置版本。
pub const LIST_NAVIGATOR_TEMPLATE: &str = include_str!("../static/list_navigator.html");

lazy_static! {
    /// 静态资源服务实际会产生的 HTTP 状态码与原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");
        map.insert(301, "Moved Permanently");
        map.insert(304, "Not Modified");
        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(414, "URI Too Long");
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(503, "Service Unavailable");
        map
    };
}

lazy_static! {
    /// 默认的文件后缀名到 MIME 类型（Media Type）映射表。
    ///
    /// 它承担两个职责：决定响应头中的 `Content-Type`，
    /// 同时充当目录扫描时的后缀白名单——不在表中的文件不会被缓冲。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        // 文本与网页
        map.insert("css", "text/css;charset=utf-8");
        map.insert("csv", "text/csv");
        map.insert("htm", "text/html;charset=utf-8");
        map.insert("html", "text/html;charset=utf-8");
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("mjs", "text/javascript");
        map.insert("txt", "text/plain");
        map.insert("xhtml", "application/xhtml+xml");
        map.insert("xml", "text/xml");
        // 图片
        map.insert("avif", "image/avif");
        map.insert("bmp", "image/bmp");
        map.insert("gif", "image/gif");
        map.insert("ico", "image/x-icon");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("tif", "image/tiff");
        map.insert("tiff", "image/tiff");
        map.insert("webp", "image/webp");
        // 音频与视频
        map.insert("aac", "audio/aac");
        map.insert("mid", "audio/x-midi");
        map.insert("midi", "audio/x-midi");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("mpeg", "video/mpeg");
        map.insert("oga", "audio/ogg");
        map.insert("ogv", "video/ogg");
        map.insert("opus", "audio/opus");
        map.insert("wav", "audio/wav");
        map.insert("weba", "audio/webm");
        map.insert("webm", "video/webm");
        // 字体
        map.insert("eot", "application/vnd.ms-fontobject");
        map.insert("otf", "font/otf");
        map.insert("ttf", "font/ttf");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        // 文档与归档
        map.insert("7z", "application/x-7z-compressed");
        map.insert("bz2", "application/x-bzip2");
        map.insert("gz", "application/gzip");
        map.insert("pdf", "application/pdf");
        map.insert("rar", "application/x-rar-compressed");
        map.insert("tar", "application/x-tar");
        map.insert("zip", "application/zip");
        // 其它
        map.insert("bin", "application/octet-stream");
        map.insert("wasm", "application/wasm");
        map
    };
}

/// 根据资源键的后缀名查找 MIME 类型，无法识别时回退到二进制流类型。
pub fn mime_for(key: &str, table: &HashMap<String, String>) -> String {
    let extension = key.rsplit('/').next().and_then(|name| {
        // 以点开头的隐藏文件名不视为后缀
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    });
    match extension.and_then(|e| table.get(e)) {
        Some(v) => v.clone(),
        None => "application/octet-stream".to_string(),
    }
}
