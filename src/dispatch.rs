// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分发模块
//!
//! 该模块是 `webroot` 的对外核心，负责把一次抽象请求变成一次响应：
//! 1. 调用路径解析器确定资源（缓存命中或直读磁盘）。
//! 2. 组装响应头（配置的基础头加上按后缀推断的 `content-type`）。
//! 3. 未命中时依次套用目录导航页与未命中策略。
//!
//! 分发器自身不保存请求间状态；所有状态都集中在不可变快照中，
//! 重建时整体替换，读取方永远看到某次完整构建的结果。

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use log::{debug, error, warn};

use crate::config::{Config, ConfigPatch, NotFoundPolicy};
use crate::exception::Exception;
use crate::listing;
use crate::param::mime_for;
use crate::resolver::{self, Resolved};
use crate::store::{self, Snapshot};

/// 抽象的入站请求：核心只关心原始路径（可以带查询串）。
pub trait IncomingRequest {
    fn raw_path(&self) -> &str;
}

/// 抽象的响应出口。`end` 必须且只会被调用一次。
pub trait ResponseSink {
    fn set_status(&mut self, code: u16);
    fn set_header(&mut self, name: &str, value: &str);
    fn write(&mut self, bytes: &[u8]);
    fn end(&mut self);
}

/// 成功送出一次响应后交给访问日志钩子的事件记录。
#[derive(Debug, Clone)]
pub struct ServedEvent {
    pub path: String,
    pub status: u16,
    pub content_length: usize,
}

type AccessLogHook = Box<dyn Fn(&ServedEvent) + Send + Sync>;

/// 静态资源宿主：持有当前快照，对外提供请求分发与重建入口。
pub struct WebRoot {
    state: Mutex<Arc<Snapshot>>,
    access_log: Option<AccessLogHook>,
}

impl WebRoot {
    /// 按给定配置完成首次构建。构建失败视为启动失败。
    pub fn new(config: Config) -> Result<Self, Exception> {
        let snapshot = store::build(config)?;
        Ok(Self {
            state: Mutex::new(Arc::new(snapshot)),
            access_log: None,
        })
    }

    /// 注册访问日志钩子，在每次成功送出内容后调用。
    pub fn with_access_log<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ServedEvent) + Send + Sync + 'static,
    {
        self.access_log = Some(Box::new(hook));
        self
    }

    /// 当前快照的只读句柄。
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.lock_state())
    }

    /// 整体替换配置并全量重建。
    ///
    /// 构建在锁外完成，锁只保护最后的指针交换，重建期间的查询
    /// 不会被阻塞。构建失败时旧快照原样保留，读取方要么看到旧的
    /// 完整快照、要么看到新的完整快照。
    pub fn reconfigure(&self, config: Config) -> Result<(), Exception> {
        let snapshot = store::build(config)?;
        let mut guard = self.lock_state();
        *guard = Arc::new(snapshot);
        Ok(())
    }

    /// 把补丁合并到当前配置上再全量重建。
    pub fn apply_patch(&self, patch: ConfigPatch) -> Result<(), Exception> {
        let config = self.snapshot().config().merged(patch);
        self.reconfigure(config)
    }

    /// 程序化注入单个资源，不触发重新扫描。
    /// 写时复制：克隆当前快照、插入、整体换入。
    pub fn insert_buffer(&self, public_path: &str, content: Bytes) {
        let mut guard = self.lock_state();
        let mut next = (**guard).clone();
        next.insert_buffer(public_path, content);
        *guard = Arc::new(next);
    }

    /// 处理一次请求。
    ///
    /// 返回 `Ok(true)` 表示响应已经写出；`Ok(false)` 表示按配置
    /// 这次未命中不由本层处理，调用方自行决定如何响应。
    pub fn handle<R, S>(&self, request: &R, sink: &mut S, id: u128) -> Result<bool, Exception>
    where
        R: IncomingRequest + ?Sized,
        S: ResponseSink + ?Sized,
    {
        let snapshot = self.snapshot();
        let stripped = resolver::strip_query(request.raw_path());

        // 1. 路径解析：命中即送出内容
        if let Some(resolved) = resolver::resolve(&snapshot, request.raw_path()) {
            let content = match &resolved {
                Resolved::Buffered(key) => match snapshot.assets().get(key) {
                    Some(bytes) => bytes.clone(),
                    None => {
                        // resolve 刚在同一快照上确认过该键，走到这里说明代码有错
                        error!("[ID{}]缓存键{}在快照中消失", id, key);
                        panic!();
                    }
                },
                Resolved::Disk(_, path) => {
                    Bytes::from(fs::read(path).map_err(|e| Exception::DirectReadFailed {
                        path: path.clone(),
                        source: e,
                    })?)
                }
            };
            let content_type = mime_for(resolved.key(), snapshot.config().mime_table());

            sink.set_status(200);
            for (name, value) in assemble_headers(snapshot.config(), &content_type) {
                sink.set_header(&name, &value);
            }
            sink.write(&content);
            sink.end();
            debug!("[ID{}]路径{}解析为{}，响应200", id, stripped, resolved.key());
            self.fire_access_log(&stripped, 200, content.len());
            return Ok(true);
        }

        // 2. 未命中但指向已知目录：导航页
        if let Some(directory) = listing::navigable(&snapshot, &stripped) {
            let page = listing::render(&snapshot, &directory);
            sink.set_status(200);
            for (name, value) in
                assemble_headers(snapshot.config(), "text/html;charset=utf-8")
            {
                sink.set_header(&name, &value);
            }
            sink.write(&page);
            sink.end();
            debug!("[ID{}]路径{}未命中，返回目录{}的导航页", id, stripped, directory);
            self.fire_access_log(&stripped, 200, page.len());
            return Ok(true);
        }

        // 3. 未命中策略
        match snapshot.config().not_found_policy() {
            NotFoundPolicy::Handled(false) => {
                debug!("[ID{}]路径{}未命中，交还调用方处理", id, stripped);
                Ok(false)
            }
            NotFoundPolicy::Handled(true) => {
                sink.set_status(404);
                sink.end();
                debug!("[ID{}]路径{}未命中，响应空404", id, stripped);
                Ok(true)
            }
            NotFoundPolicy::Page(file) => {
                let body = match snapshot.system().not_found_page() {
                    Some(bytes) => bytes.clone(),
                    None => {
                        let path = Path::new(snapshot.config().root_dir()).join(file);
                        Bytes::from(fs::read(&path).map_err(|_| {
                            Exception::NotFoundPageUnreadable { path: path.clone() }
                        })?)
                    }
                };
                sink.set_status(404);
                sink.set_header("content-type", &mime_for(file, snapshot.config().mime_table()));
                sink.write(&body);
                sink.end();
                debug!("[ID{}]路径{}未命中，响应自定义404页面", id, stripped);
                Ok(true)
            }
        }
    }

    fn fire_access_log(&self, path: &str, status: u16, content_length: usize) {
        if let Some(hook) = &self.access_log {
            hook(&ServedEvent {
                path: path.to_string(),
                status,
                content_length,
            });
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Arc<Snapshot>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("快照锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }
}

// 每次分发都重新组装响应头：配置的基础头加上本次的 content-type，
// 绝不回写共享的配置对象。
fn assemble_headers(config: &Config, content_type: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = config
        .response_headers()
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    headers.sort();
    headers.push(("content-type".to_string(), content_type.to_string()));
    headers
}
