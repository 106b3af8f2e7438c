use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::error;
use std::collections::HashMap;
use std::fs::File;
use std::io::prelude::*;

use crate::param::MIME_TYPES;

/// 未命中资源时的处理策略。
///
/// 在配置文件中写成布尔值或字符串：
/// - `false`：不做任何响应，把请求交还给调用方处理；
/// - `true`：返回空响应体的 404；
/// - `"error.html"`：返回 404，响应体为该文件的内容。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum NotFoundPolicy {
    Handled(bool),
    Page(String),
}

impl Default for NotFoundPolicy {
    fn default() -> Self {
        NotFoundPolicy::Handled(true)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_url_prefix")]
    url_prefix: String,
    #[serde(default = "default_root_dir")]
    root_dir: String,
    #[serde(default = "default_mime_table")]
    mime_table: HashMap<String, String>,
    #[serde(default)]
    response_headers: HashMap<String, String>,
    #[serde(default = "default_buffering_enabled")]
    buffering_enabled: bool,
    #[serde(default = "default_buffering_max_size")]
    buffering_max_size: u64,
    #[serde(default)]
    direct_reading_enabled: bool,
    #[serde(default)]
    not_found_policy: NotFoundPolicy,
    #[serde(default = "default_directory_index")]
    directory_index: Vec<String>,
    #[serde(default)]
    list_navigator_enabled: bool,
    #[serde(default)]
    list_navigator_template: Option<String>,
}

fn default_url_prefix() -> String {
    "/".to_string()
}

fn default_root_dir() -> String {
    "www".to_string()
}

fn default_mime_table() -> HashMap<String, String> {
    MIME_TYPES
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_buffering_enabled() -> bool {
    true
}

fn default_buffering_max_size() -> u64 {
    4194304 // 4MB
}

fn default_directory_index() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            url_prefix: default_url_prefix(),
            root_dir: default_root_dir(),
            mime_table: default_mime_table(),
            response_headers: HashMap::new(),
            buffering_enabled: default_buffering_enabled(),
            buffering_max_size: default_buffering_max_size(),
            direct_reading_enabled: false,
            not_found_policy: NotFoundPolicy::default(),
            directory_index: default_directory_index(),
            list_navigator_enabled: false,
            list_navigator_template: None,
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => panic!("no such file {} exception:{}", filename, e),
        };
        let mut str_val = String::new();
        match file.read_to_string(&mut str_val) {
            Ok(s) => s,
            Err(e) => panic!("Error Reading file: {}", e),
        };

        match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(_) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置");
                Config::new()
            }
        }
    }

    /// 把一个补丁逐字段合并到当前配置上，返回合并后的完整配置。
    ///
    /// 补丁中为 `None` 的字段保持原值。合并是整体性的、与字段顺序无关的。
    pub fn merged(&self, patch: ConfigPatch) -> Config {
        let mut merged = self.clone();
        if let Some(v) = patch.url_prefix {
            merged.url_prefix = v;
        }
        if let Some(v) = patch.root_dir {
            merged.root_dir = v;
        }
        if let Some(v) = patch.mime_table {
            merged.mime_table = v;
        }
        if let Some(v) = patch.response_headers {
            merged.response_headers = v;
        }
        if let Some(v) = patch.buffering_enabled {
            merged.buffering_enabled = v;
        }
        if let Some(v) = patch.buffering_max_size {
            merged.buffering_max_size = v;
        }
        if let Some(v) = patch.direct_reading_enabled {
            merged.direct_reading_enabled = v;
        }
        if let Some(v) = patch.not_found_policy {
            merged.not_found_policy = v;
        }
        if let Some(v) = patch.directory_index {
            merged.directory_index = v;
        }
        if let Some(v) = patch.list_navigator_enabled {
            merged.list_navigator_enabled = v;
        }
        if let Some(v) = patch.list_navigator_template {
            merged.list_navigator_template = Some(v);
        }
        merged
    }
}

impl Config {
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    pub fn mime_table(&self) -> &HashMap<String, String> {
        &self.mime_table
    }

    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.response_headers
    }

    pub fn buffering_enabled(&self) -> bool {
        self.buffering_enabled
    }

    pub fn buffering_max_size(&self) -> u64 {
        self.buffering_max_size
    }

    pub fn direct_reading_enabled(&self) -> bool {
        self.direct_reading_enabled
    }

    pub fn not_found_policy(&self) -> &NotFoundPolicy {
        &self.not_found_policy
    }

    pub fn directory_index(&self) -> &[String] {
        &self.directory_index
    }

    pub fn list_navigator_enabled(&self) -> bool {
        self.list_navigator_enabled
    }

    pub fn list_navigator_template(&self) -> Option<&str> {
        self.list_navigator_template.as_deref()
    }
}

// 测试用的构造器。核心逻辑的测试需要灵活拼装配置，
// 但对外仍然只暴露只读访问器，避免运行期被旁路修改。
impl Config {
    pub fn with_root_dir(mut self, root_dir: &str) -> Self {
        self.root_dir = root_dir.to_string();
        self
    }

    pub fn with_url_prefix(mut self, url_prefix: &str) -> Self {
        self.url_prefix = url_prefix.to_string();
        self
    }

    pub fn with_buffering_enabled(mut self, enabled: bool) -> Self {
        self.buffering_enabled = enabled;
        self
    }

    pub fn with_buffering_max_size(mut self, max_size: u64) -> Self {
        self.buffering_max_size = max_size;
        self
    }

    pub fn with_direct_reading_enabled(mut self, enabled: bool) -> Self {
        self.direct_reading_enabled = enabled;
        self
    }

    pub fn with_not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found_policy = policy;
        self
    }

    pub fn with_directory_index(mut self, candidates: Vec<String>) -> Self {
        self.directory_index = candidates;
        self
    }

    pub fn with_list_navigator_enabled(mut self, enabled: bool) -> Self {
        self.list_navigator_enabled = enabled;
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response_headers
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_mime_entry(mut self, extension: &str, content_type: &str) -> Self {
        self.mime_table
            .insert(extension.to_string(), content_type.to_string());
        self
    }
}

/// 配置补丁：每个字段都是可选的，用于 reconfigure 时的增量合并。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ConfigPatch {
    pub url_prefix: Option<String>,
    pub root_dir: Option<String>,
    pub mime_table: Option<HashMap<String, String>>,
    pub response_headers: Option<HashMap<String, String>>,
    pub buffering_enabled: Option<bool>,
    pub buffering_max_size: Option<u64>,
    pub direct_reading_enabled: Option<bool>,
    pub not_found_policy: Option<NotFoundPolicy>,
    pub directory_index: Option<Vec<String>>,
    pub list_navigator_enabled: Option<bool>,
    pub list_navigator_template: Option<String>,
}
