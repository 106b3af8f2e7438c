// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态资源服务器适配层
//!
//! 该模块是 `webroot` 核心引擎的薄适配器，基于 Tokio 运行时对外提供 HTTP 服务。
//! 职责范围：
//! - 监听 TCP 连接并解析最小化的 HTTP/1.1 请求（仅 GET/HEAD）
//! - 把请求交给核心分发器，并将抽象响应序列化到 Socket
//! - 后台管理控制台（stop / status / reload 指令交互）
//!
//! 压缩、Range 请求等传输层增强都不在本服务器的范围之内。

use serde_derive::Deserialize;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::{Arc, Mutex},
    time::Instant,
};

use webroot::{
    request::HttpRequestMethod, Config, Exception, HttpResponse, Request, WebRoot,
};

/// 配置文件路径。核心配置与监听参数共用一个 TOML 文件。
const CONFIG_PATH: &str = "config/default.toml";

/// 监听层自己的运行参数，与核心配置同文件、互不相识。
#[derive(Deserialize, Debug, Clone)]
struct ServerConfig {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

impl ServerConfig {
    fn from_toml(filename: &str) -> Self {
        let str_val = match std::fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) => panic!("no such file {} exception:{}", filename, e),
        };
        let mut config: ServerConfig = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(_) => {
                error!("无法解析监听配置，使用默认值");
                ServerConfig {
                    port: default_port(),
                    local: default_local(),
                    worker_threads: 0,
                }
            }
        };
        if config.worker_threads == 0 {
            config.worker_threads = num_cpus::get();
        }
        config
    }
}

/// # 程序入口点
///
/// 初始化日志、加载配置、完成首次资源缓冲并启动主事件循环。
fn main() {
    // 1. 初始化日志系统：采用 log4rs 异步日志架构，通过外部 YAML 灵活配置级别与输出目的地
    log4rs::init_file("config/log4rs.yaml", Default::default()).unwrap();

    // 2. 环境配置加载：核心配置与监听配置都来自同一个 TOML 文件
    let config = Config::from_toml(CONFIG_PATH);
    let server_config = ServerConfig::from_toml(CONFIG_PATH);
    info!("配置文件已载入");
    info!("content root: {}", config.root_dir());

    // 3. 首次构建资源缓存。构建失败属于启动失败，直接退出
    let host = match WebRoot::new(config) {
        Ok(host) => host,
        Err(e) => {
            error!("资源缓冲构建失败：{}", e);
            panic!("资源缓冲构建失败：{}", e);
        }
    };
    // 访问日志钩子：每次成功送出内容后记录一行结构化日志
    let host = Arc::new(host.with_access_log(|event| {
        info!(
            "{}, {}, {} bytes",
            event.path, event.status, event.content_length
        );
    }));
    info!("资源缓冲构建完成");

    // 4. 异步运行时定制：根据配置动态分配工作线程数
    let runtime = Builder::new_multi_thread()
        .worker_threads(server_config.worker_threads)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(serve(host, server_config));
}

async fn serve(host: Arc<WebRoot>, server_config: ServerConfig) {
    // 5. 网络层初始化：支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port = server_config.port;
    let address = match server_config.local {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let socket = SocketAddrV4::new(address, port);

    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            panic!("无法绑定端口：{}，错误：{}", port, e);
        }
    };
    info!("端口{}绑定完成", port);

    // 6. 服务器状态与生命周期管理
    // shutdown_flag: 用于优雅停机；active_connection: 追踪当前并发连接数
    let shutdown_flag = Arc::new(Mutex::new(false));
    let active_connection = Arc::new(Mutex::new(0u32));

    // 7. 启动交互式管理控制台任务（后台运行，不阻塞监听循环）
    tokio::spawn({
        let shutdown_flag = Arc::clone(&shutdown_flag);
        let active_connection = Arc::clone(&active_connection);
        let host = Arc::clone(&host);
        async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut input = String::new();
            loop {
                input.clear();
                if reader.read_line(&mut input).await.is_ok() {
                    let cmd = input.trim();
                    match cmd {
                        "stop" => {
                            let mut flag = shutdown_flag.lock().unwrap();
                            *flag = true;
                            println!("停机指令已激活，服务器将在处理完下一个请求后关闭...");
                            break;
                        }
                        "reload" => {
                            // 重新读取配置并全量重建缓存；失败时旧缓存保持可用
                            let config = Config::from_toml(CONFIG_PATH);
                            match host.reconfigure(config) {
                                Ok(_) => println!("配置已重载，资源缓存已重建"),
                                Err(e) => println!("重载失败，沿用旧缓存：{}", e),
                            }
                        }
                        "status" => {
                            let active_count = *active_connection.lock().unwrap();
                            let snapshot = host.snapshot();
                            println!("== Webroot 状态 ====");
                            println!("当前活跃连接数: {}", active_count);
                            println!("缓冲资源数: {}", snapshot.assets().len());
                            println!("已知目录数: {}", snapshot.directories().len());
                            println!("====================");
                        }
                        "help" => {
                            println!("== Webroot Help ===");
                            println!("stop   - 发出停机信号");
                            println!("status - 查看当前服务器运行状态");
                            println!("reload - 重新加载配置并重建资源缓存");
                            println!("help   - 显示此帮助信息");
                            println!("====================");
                        }
                        _ => {
                            println!("无效的命令：{}", cmd);
                        }
                    }
                } else {
                    break;
                }
            }
        }
    });

    let mut id: u128 = 0;

    // 8. 主事件循环 (Accept Loop)
    loop {
        // 检查停机标志位
        if *shutdown_flag.lock().unwrap() {
            info!("主循环接收到停机指令，正在退出...");
            break;
        }

        let (mut stream, addr) = listener.accept().await.unwrap();
        debug!("新的连接：{}", addr);

        let active_connection_arc = Arc::clone(&active_connection);
        let host_arc = Arc::clone(&host);

        debug!("[ID{}]TCP连接已建立", id);

        tokio::spawn(async move {
            {
                let mut lock = active_connection_arc.lock().unwrap();
                *lock += 1;
            }

            handle_connection(&mut stream, id, host_arc).await;

            {
                let mut lock = active_connection_arc.lock().unwrap();
                *lock -= 1;
            }
        });
        id += 1; // 请求唯一标识递增
    }
}

/// # 连接处理器
///
/// 负责单个 TCP 流的生命周期：读取并解析请求、交给核心分发器、序列化响应。
async fn handle_connection(stream: &mut TcpStream, id: u128, host: Arc<WebRoot>) {
    let mut buffer = vec![0; 1024];

    stream.readable().await.unwrap();

    match stream.try_read(&mut buffer) {
        Ok(0) => return, // 客户端主动关闭连接
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
        _ => {}
    }
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();

    // 1. 协议解析阶段
    let request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(Exception::UnSupportedRequestMethod) => {
            warn!("[ID{}]不支持的请求方法，返回405", id);
            let response = HttpResponse::from_status_code(405, false);
            let _ = stream.write_all(&response.as_bytes()).await;
            return;
        }
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {}", id, e);
            let response = HttpResponse::from_status_code(400, false);
            let _ = stream.write_all(&response.as_bytes()).await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    let headonly = request.method() == HttpRequestMethod::Head;

    // 2. 核心分发阶段：响应体写入抽象的 ResponseSink
    let mut response = HttpResponse::new(headonly);
    let outcome = host.handle(&request, &mut response, id);

    let response = match outcome {
        Ok(true) => response,
        Ok(false) => {
            // 核心按配置不处理这次未命中，适配层自行兜底
            warn!("[ID{}]请求的路径：{} 未被核心处理，返回404", id, request.path());
            HttpResponse::from_status_code(404, headonly)
        }
        Err(e) => {
            error!("[ID{}]分发请求时发生异常: {}", id, e);
            HttpResponse::from_status_code(500, headonly)
        }
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 3. 结构化日志记录：便于后期审计与性能监控
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, ",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    // 4. 数据发送阶段
    let response_bytes = response.as_bytes();
    debug!("[ID{}]发送全量响应，长度: {}", id, response_bytes.len());
    let _ = stream.write_all(&response_bytes).await;
    let _ = stream.flush().await;
}
