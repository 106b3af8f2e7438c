//! 路径解析：把原始请求路径映射到缓存键或磁盘文件，未命中时返回 `None`。

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::store::{collapse_slashes, root_public, Snapshot};

/// 解析结果：命中缓存，或（直读模式下）命中磁盘上的普通文件。
/// 两种情况都携带公开键，供分发器查 MIME 类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Buffered(String),
    Disk(String, PathBuf),
}

impl Resolved {
    pub fn key(&self) -> &str {
        match self {
            Resolved::Buffered(key) => key,
            Resolved::Disk(key, _) => key,
        }
    }
}

/// 去掉查询串后的规范请求路径。
pub fn strip_query(raw_path: &str) -> String {
    let without_query = raw_path.split('?').next().unwrap_or(raw_path);
    collapse_slashes(without_query)
}

/// 解析请求路径。
///
/// 候选列表为：裸路径本身，随后依次是各目录索引文件名的拼接形式。
/// 候选按顺序逐一尝试：先查缓存，缓存未命中且开启直读时再探测磁盘。
/// 首个命中者获胜，裸路径永远先于任何索引替换。
pub fn resolve(snapshot: &Snapshot, raw_path: &str) -> Option<Resolved> {
    let stripped = strip_query(raw_path);
    let config = snapshot.config();

    let mut candidates = Vec::with_capacity(1 + config.directory_index().len());
    candidates.push(stripped.clone());
    let base = stripped.trim_end_matches('/');
    for index_name in config.directory_index() {
        candidates.push(format!("{}/{}", base, index_name));
    }

    for candidate in &candidates {
        if config.buffering_enabled() && snapshot.assets().contains_key(candidate) {
            debug!("候选{}命中缓存", candidate);
            return Some(Resolved::Buffered(candidate.clone()));
        }
        if config.direct_reading_enabled() {
            if let Some(path) = probe_disk(snapshot, candidate) {
                debug!("候选{}命中磁盘文件{}", candidate, path.display());
                return Some(Resolved::Disk(candidate.clone(), path));
            }
        }
    }
    None
}

// 把候选键换算成根目录下的相对路径并探测普通文件。
// 含有 `..` 段的候选一律不上磁盘。
fn probe_disk(snapshot: &Snapshot, candidate: &str) -> Option<PathBuf> {
    let config = snapshot.config();
    let prefix = root_public(config.url_prefix());
    let relative = if prefix == "/" {
        candidate.trim_start_matches('/')
    } else {
        let rest = candidate.strip_prefix(&prefix)?;
        // 前缀必须在路径段边界上结束，否则 /assetsfoo 会被误判在 /assets 之下
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        rest.trim_start_matches('/')
    };
    if relative.is_empty() {
        return None;
    }
    if relative.split('/').any(|segment| segment == "..") {
        debug!("候选{}含有上溯段，拒绝磁盘探测", candidate);
        return None;
    }

    let path = Path::new(config.root_dir()).join(relative);
    match fs::metadata(&path) {
        Ok(metadata) if metadata.is_file() => Some(path),
        _ => None,
    }
}
