// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 安全回归测试套件
//!
//! 该模块通过模拟常见的 Web 攻击向量验证核心引擎的防御能力。
//! 覆盖范围包括：
//! - 路径遍历 (Path Traversal / LFI)
//! - 注入攻击 (Null Byte / 特殊字符)
//! - 超长路径与畸形报文的健壮性

use std::fs;

use tempfile::TempDir;

use webroot::{Config, HttpResponse, Request, WebRoot};

/// 构造一个开启直读模式的宿主，根目录外放置一个"敏感文件"
fn direct_reading_host() -> (TempDir, TempDir, WebRoot) {
    let outer = TempDir::new().unwrap();
    fs::write(outer.path().join("secret.txt"), b"top secret").unwrap();

    let root = TempDir::new_in(outer.path()).unwrap();
    fs::write(root.path().join("public.txt"), b"public").unwrap();

    let host = WebRoot::new(
        Config::new()
            .with_root_dir(root.path().to_str().unwrap())
            .with_direct_reading_enabled(true),
    )
    .unwrap();
    (outer, root, host)
}

fn status_of(host: &WebRoot, raw_request: &str) -> u16 {
    let buffer = raw_request.as_bytes().to_vec();
    let request = Request::try_from(&buffer, 0).unwrap();
    let mut response = HttpResponse::new(false);
    host.handle(&request, &mut response, 0).unwrap();
    response.status_code()
}

/// ## 攻击向量：基础路径遍历
/// 验证直读模式下 `../` 越权访问根目录之外文件的企图被拦截。
#[test]
fn test_path_traversal_simple() {
    let (_outer, _root, host) = direct_reading_host();

    let attacks = vec![
        "GET /../secret.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "GET /../../etc/passwd HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "GET /sub/../../secret.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
    ];

    for attack in attacks {
        let status = status_of(&host, attack);
        assert_ne!(status, 200, "路径遍历攻击应该被阻止: {}", attack);
    }

    // 正常路径不受影响
    assert_eq!(
        status_of(&host, "GET /public.txt HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        200
    );
}

/// ## 攻击向量：URL 编码混淆遍历
/// 核心不做百分号解码，编码后的 `..` 既匹配不到缓存键，也换算不出合法磁盘路径。
#[test]
fn test_path_traversal_encoded() {
    let (_outer, _root, host) = direct_reading_host();

    let attacks = vec![
        "GET /%2e%2e/secret.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "GET /..%2fsecret.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
    ];

    for attack in attacks {
        let status = status_of(&host, attack);
        assert_ne!(status, 200, "编码路径遍历应该被阻止: {}", attack);
    }
}

/// ## 攻击向量：空字节注入 (Null Byte Injection)
/// 验证字符串处理逻辑能防御经典的 C/C++ 风格截断攻击。
#[test]
fn test_null_byte_injection() {
    let (_outer, _root, host) = direct_reading_host();

    let buffer = b"GET /public.txt\0.png HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec();
    let request = Request::try_from(&buffer, 0).unwrap();
    let mut response = HttpResponse::new(false);
    host.handle(&request, &mut response, 0).unwrap();

    assert_ne!(response.status_code(), 200, "应该拒绝空字节注入");
}

/// ## 压力测试：超长请求路径
/// 确保解析与解析候选生成在 GB 级别以下的长路径上不会崩溃。
#[test]
fn test_oversized_request_path() {
    let (_outer, _root, host) = direct_reading_host();

    let long_path = "A".repeat(10000);
    let attack = format!("GET /{} HTTP/1.1\r\nHost: localhost\r\n\r\n", long_path);

    let status = status_of(&host, &attack);
    assert_eq!(status, 404);
}

/// ## 安全扫描：URI 特殊字符处理
/// 检查解析器在面对 XSS 脚本标签或 SQL 注入关键词时的安全性。
#[test]
fn test_special_characters_in_path() {
    let (_outer, _root, host) = direct_reading_host();

    let special_paths = vec![
        "GET /<script>alert('xss')</script> HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "GET /'; DROP TABLE users-- HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "GET /${{7*7}} HTTP/1.1\r\nHost: localhost\r\n\r\n",
    ];

    for path_request in special_paths {
        let status = status_of(&host, path_request);
        assert_eq!(status, 404, "特殊字符路径应该只是未命中");
    }
}

/// ## 健壮性：隐藏文件不进入缓存
/// 没有后缀（或以点开头）的文件不在 MIME 白名单内，不会被缓冲。
#[test]
fn test_dotfiles_not_buffered() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join(".htaccess"), b"deny all").unwrap();
    fs::write(root.path().join("visible.txt"), b"ok").unwrap();

    let host = WebRoot::new(
        Config::new().with_root_dir(root.path().to_str().unwrap()),
    )
    .unwrap();

    assert_eq!(
        status_of(&host, "GET /.htaccess HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        404
    );
    assert_eq!(
        status_of(&host, "GET /visible.txt HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        200
    );
}
