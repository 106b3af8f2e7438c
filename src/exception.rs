// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了资源缓冲与请求分发过程中可能抛出的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖构建期的文件系统错误、分发期的读取错误，以及协议适配层的解析错误。
//! - **语义映射**：构建期异常是致命的一次性失败（不会安装半成品缓存）；
//!   分发期异常只影响当前请求；解析异常由适配层转化为对应的 HTTP 状态码。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志。

use std::fmt;
use std::io;
use std::path::PathBuf;

/// 构建缓存或分发请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug)]
pub enum Exception {
    /// 目录扫描期间无法读取某个目录或文件。
    /// 整个构建随之失败，旧的缓存快照保持不变。
    WalkIo { path: PathBuf, source: io::Error },
    /// 目录扫描超过了最大递归深度，通常意味着源目录中存在符号链接环。
    WalkDepthExceeded { path: PathBuf },
    /// 直读模式下命中的文件在实际读取时失败（例如在探测与读取之间被删除）。
    DirectReadFailed { path: PathBuf, source: io::Error },
    /// 配置指定的自定义 404 页面无法读取。该异常只影响当前请求的分发。
    NotFoundPageUnreadable { path: PathBuf },
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了适配层暂不支持的 HTTP 方法（GET/HEAD 以外的方法）。
    UnSupportedRequestMethod,
    /// 客户端使用了不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
}

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exception::WalkIo { path, source } => {
                write!(f, "Walk failed at {}: {}", path.display(), source)
            }
            Exception::WalkDepthExceeded { path } => {
                write!(f, "Walk depth exceeded at {}", path.display())
            }
            Exception::DirectReadFailed { path, source } => {
                write!(f, "Direct read failed for {}: {}", path.display(), source)
            }
            Exception::NotFoundPageUnreadable { path } => {
                write!(f, "Configured not-found page {} is unreadable", path.display())
            }
            Exception::RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            Exception::UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            Exception::UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_walk_io() {
        let e = Exception::WalkIo {
            path: PathBuf::from("/srv/www/broken"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        let text = format!("{}", e);
        assert!(text.contains("/srv/www/broken"));
        assert!(text.contains("permission denied"));
    }

    #[test]
    fn test_display_not_found_page() {
        let e = Exception::NotFoundPageUnreadable {
            path: PathBuf::from("error.html"),
        };
        assert!(format!("{}", e).contains("error.html"));
    }

    #[test]
    fn test_display_parse_errors() {
        assert_eq!(
            format!("{}", Exception::RequestIsNotUtf8),
            "Request bytes can't be parsed in UTF-8"
        );
        assert_eq!(
            format!("{}", Exception::UnsupportedHttpVersion),
            "Unsupported HTTP version"
        );
    }
}
