// src/downloader/paths.rs

use crate::{
    extractor::course::CourseRoot,
    tree::{ContentNode, Node, NodeId, derive},
    utils,
};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

/// 保存目录布局: `<base>/<课程名> (<日期>)/<结构路径>/<文件名>`
#[derive(Debug, Clone)]
pub struct SaveLayout {
    pub base_dir: PathBuf,
    pub flatten: bool,
    pub date: String,
}

impl SaveLayout {
    pub fn new(base_dir: PathBuf, flatten: bool) -> Self {
        Self {
            base_dir,
            flatten,
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn course_dir(&self, course_title: Option<&str>) -> PathBuf {
        let title = course_title.unwrap_or("course");
        self.base_dir
            .join(utils::sanitize_filename(&format!("{} ({})", title, self.date)))
    }

    /// 节点所在的保存目录；平铺模式下所有文件都在课程目录中
    pub fn save_dir(&self, nodes: &[Node], id: NodeId, course_title: Option<&str>) -> PathBuf {
        let mut dir = self.course_dir(course_title);
        if !self.flatten {
            for title in derive::resource_titles(nodes, id) {
                dir.push(utils::sanitize_filename(&title));
            }
        }
        dir
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    Some(match essence {
        "application/pdf" => "pdf",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" => "wav",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        _ => return None,
    })
}

/// 文件名: 带扩展名的标题 → 带扩展名的文件名 → URL 中的文件名 → 标题 (按 MIME 补扩展名)
pub fn derive_filename(title: Option<&str>, content: &ContentNode) -> String {
    let with_ext = |s: Option<&str>| {
        s.map(str::trim)
            .filter(|s| utils::has_file_extension(s))
            .map(str::to_string)
    };
    let from_url = content.fetch_url().and_then(utils::filename_from_url);

    let name = with_ext(title)
        .or_else(|| with_ext(content.file_name.as_deref()))
        .or_else(|| with_ext(from_url.as_deref()))
        .unwrap_or_else(|| {
            let stem = title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .or(from_url)
                .unwrap_or_else(|| "unnamed".to_string());
            match content.mime_type.as_deref().and_then(extension_for_mime) {
                Some(ext) => format!("{}.{}", stem, ext),
                None => stem,
            }
        });
    utils::sanitize_filename(&name)
}

/// 同一目录下重名时追加 " (n)"
fn claim_unique(path: PathBuf, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    if claimed.insert(path.clone()) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    (2..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            dir.join(name)
        })
        .find(|candidate| claimed.insert(candidate.clone()))
        .unwrap_or(path)
}

/// 为清单中每个带地址的内容节点规划保存路径，按登记顺序分配重名后缀
pub fn plan_save_paths(root: &CourseRoot, layout: &SaveLayout) -> HashMap<NodeId, PathBuf> {
    let nodes = root.tree.read();
    let mut claimed = HashSet::new();
    let mut planned = HashMap::new();
    for (_, id) in root.manifest.content_view() {
        let Some(content) = nodes.get(id).and_then(Node::as_content) else {
            continue;
        };
        if content.fetch_url().is_none() {
            continue;
        }
        let filename = derive_filename(nodes[id].title.as_deref(), content);
        let path = layout
            .save_dir(&nodes, id, root.title.as_deref())
            .join(filename);
        planned.insert(id, claim_unique(path, &mut claimed));
    }
    planned
}
