//! 资源仓库：一次性扫描内容根目录，构建以公开 URL 路径为键的内存缓存。

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::{debug, warn};

use crate::config::{Config, NotFoundPolicy};
use crate::exception::Exception;
use crate::param::{LIST_NAVIGATOR_TEMPLATE, MAX_WALK_DEPTH};

/// 保留系统资源：自定义 404 页面与目录列表模板。
/// 与用户内容分开存放，避免与真实路径的键发生混淆。
#[derive(Clone)]
pub struct SystemAssets {
    not_found_page: Option<Bytes>,
    list_template: Option<Bytes>,
}

impl SystemAssets {
    pub fn not_found_page(&self) -> Option<&Bytes> {
        self.not_found_page.as_ref()
    }

    pub fn list_template(&self) -> Option<&Bytes> {
        self.list_template.as_ref()
    }
}

/// 一次构建产出的不可变快照。
///
/// 配置、资源表、目录集和系统资源作为整体被替换，
/// 任何时刻读到的都是某次完整构建的结果，不存在半成品状态。
#[derive(Clone)]
pub struct Snapshot {
    config: Config,
    assets: HashMap<String, Bytes>,
    directories: HashSet<String>,
    system: SystemAssets,
}

impl Snapshot {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn assets(&self) -> &HashMap<String, Bytes> {
        &self.assets
    }

    pub fn directories(&self) -> &HashSet<String> {
        &self.directories
    }

    pub fn system(&self) -> &SystemAssets {
        &self.system
    }

    /// 程序化注入单个资源，不触发重新扫描。
    pub fn insert_buffer(&mut self, public_path: &str, content: Bytes) {
        self.assets.insert(collapse_slashes(public_path), content);
    }
}

/// 折叠路径中的连续斜杠。缓存键永远不包含 `//`。
pub fn collapse_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                result.push(c);
            }
            prev_slash = true;
        } else {
            result.push(c);
            prev_slash = false;
        }
    }
    result
}

/// 把根目录的相对路径拼接到 URL 前缀下，生成公开键。
pub fn public_key(prefix: &str, relative: &str) -> String {
    collapse_slashes(&format!("{}/{}", prefix, relative))
}

/// URL 前缀本身的规范形式，作为目录集中根目录的键。
pub fn root_public(prefix: &str) -> String {
    let collapsed = collapse_slashes(prefix);
    let trimmed = collapsed.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 构建快照。纯函数：失败时不产生任何可见的部分状态。
pub fn build(config: Config) -> Result<Snapshot, Exception> {
    let mut assets = HashMap::new();
    let mut directories = HashSet::new();
    directories.insert(root_public(config.url_prefix()));

    if config.buffering_enabled() {
        let root = PathBuf::from(config.root_dir());
        walk_dir(&root, &root, &config, &mut assets, &mut directories, 0)?;
        debug!(
            "缓冲完成：{}个资源，{}个目录",
            assets.len(),
            directories.len()
        );
    }

    let system = load_system_assets(&config);
    Ok(Snapshot {
        config,
        assets,
        directories,
        system,
    })
}

// 深度优先递归扫描。子目录记入目录集并递归；
// 文件通过后缀白名单和大小上限后全量读入。
fn walk_dir(
    root: &Path,
    dir: &Path,
    config: &Config,
    assets: &mut HashMap<String, Bytes>,
    directories: &mut HashSet<String>,
    depth: usize,
) -> Result<(), Exception> {
    if depth > MAX_WALK_DEPTH {
        return Err(Exception::WalkDepthExceeded {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|e| Exception::WalkIo {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| Exception::WalkIo {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| Exception::WalkIo {
            path: path.clone(),
            source: e,
        })?;

        let key = match relative_key(root, &path, config.url_prefix()) {
            Some(k) => k,
            None => {
                warn!("路径{}不是合法的UTF-8，跳过", path.display());
                continue;
            }
        };

        if metadata.is_dir() {
            directories.insert(key);
            walk_dir(root, &path, config, assets, directories, depth + 1)?;
        } else if metadata.is_file() {
            let extension = path.extension().and_then(|e| e.to_str());
            let allowed = extension
                .map(|e| config.mime_table().contains_key(e))
                .unwrap_or(false);
            if !allowed {
                debug!("{}的后缀不在MIME表中，跳过", path.display());
                continue;
            }
            if metadata.len() > config.buffering_max_size() {
                debug!(
                    "{}超过缓冲上限（{} > {} bytes），跳过",
                    path.display(),
                    metadata.len(),
                    config.buffering_max_size()
                );
                continue;
            }
            let content = fs::read(&path).map_err(|e| Exception::WalkIo {
                path: path.clone(),
                source: e,
            })?;
            assets.insert(key, Bytes::from(content));
        }
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path, prefix: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let relative_str = relative.to_str()?;
    Some(public_key(prefix, &relative_str.replace('\\', "/")))
}

// 预载系统资源。自定义404页面只在启用缓冲时预载，
// 列表模板在启用导航页时载入（自定义模板不可读则回退到内置模板）。
fn load_system_assets(config: &Config) -> SystemAssets {
    let not_found_page = match (config.buffering_enabled(), config.not_found_policy()) {
        (true, NotFoundPolicy::Page(file)) => {
            let path = Path::new(config.root_dir()).join(file);
            match fs::read(&path) {
                Ok(content) => Some(Bytes::from(content)),
                Err(e) => {
                    warn!("无法预载自定义404页面{}：{}", path.display(), e);
                    None
                }
            }
        }
        _ => None,
    };

    let list_template = if config.list_navigator_enabled() {
        let custom = config.list_navigator_template().and_then(|file| {
            match fs::read(file) {
                Ok(content) => Some(Bytes::from(content)),
                Err(e) => {
                    warn!("无法读取列表模板{}，回退到内置模板：{}", file, e);
                    None
                }
            }
        });
        Some(custom.unwrap_or_else(|| Bytes::from_static(LIST_NAVIGATOR_TEMPLATE.as_bytes())))
    } else {
        None
    };

    SystemAssets {
        not_found_page,
        list_template,
    }
}
