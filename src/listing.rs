//! 目录列表页渲染：在未命中但路径指向已知目录时，合成一张导航页面。

use bytes::Bytes;
use chrono::Local;

use crate::param::{LIST_NAVIGATOR_TEMPLATE, SERVER_NAME};
use crate::store::Snapshot;

/// 判断未命中的请求路径是否适用列表导航页。
///
/// 要求开启导航功能，且去掉尾斜杠后的路径存在于目录集中。
/// 返回规范化后的目录键。
pub fn navigable(snapshot: &Snapshot, stripped_path: &str) -> Option<String> {
    if !snapshot.config().list_navigator_enabled() {
        return None;
    }
    let trimmed = trim_directory(stripped_path);
    if snapshot.directories().contains(&trimmed) {
        Some(trimmed)
    } else {
        None
    }
}

/// 渲染目录列表页。
///
/// 模板中的四个占位符被逐一替换：`{url}` 目录路径、`{back}` 父目录、
/// `{lists}` 直接子项的表格行、`{comment}` 产品标识加生成时间。
pub fn render(snapshot: &Snapshot, directory: &str) -> Bytes {
    let template = match snapshot.system().list_template() {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => LIST_NAVIGATOR_TEMPLATE.to_string(),
    };

    let comment = format!(
        "{} {}",
        SERVER_NAME,
        Local::now().format("%Y/%m/%d %H:%M:%S")
    );

    let page = template
        .replace("{url}", directory)
        .replace("{back}", &parent_of(directory))
        .replace("{lists}", &child_rows(snapshot, directory))
        .replace("{comment}", &comment);

    Bytes::from(page.into_bytes())
}

fn trim_directory(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(directory: &str) -> String {
    match directory.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => directory[..idx].to_string(),
    }
}

// 收集直接子项并拼成表格行。子目录排在文件前面，各自按名称排序。
fn child_rows(snapshot: &Snapshot, directory: &str) -> String {
    let child_prefix = if directory == "/" {
        "/".to_string()
    } else {
        format!("{}/", directory)
    };

    let mut subdirs: Vec<&str> = snapshot
        .directories()
        .iter()
        .filter_map(|d| immediate_child(&child_prefix, d))
        .collect();
    subdirs.sort_unstable();

    let mut files: Vec<&str> = snapshot
        .assets()
        .keys()
        .filter_map(|k| immediate_child(&child_prefix, k))
        .collect();
    files.sort_unstable();

    let mut rows = String::new();
    for name in subdirs {
        rows.push_str(&format!(
            r#"            <tr>
                <td><a href="{}{}/">{}/</a></td>
                <td>文件夹</td>
            </tr>
"#,
            child_prefix, name, name
        ));
    }
    for name in files {
        rows.push_str(&format!(
            r#"            <tr>
                <td><a href="{}{}">{}</a></td>
                <td>文件</td>
            </tr>
"#,
            child_prefix, name, name
        ));
    }
    rows
}

// 路径恰好比目录多一段时返回该段，否则返回 None。
fn immediate_child<'a>(child_prefix: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(child_prefix)?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}
