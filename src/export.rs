// src/export.rs

use crate::{
    downloader::{SaveLayout, paths},
    error::AppResult,
    extractor::{classifier::ContentKind, course::CourseRoot},
    tree::{Hosting, Node, NodeKind, derive},
};
use log::info;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize)]
pub struct ExportItem {
    pub title: Option<String>,
    pub url: Option<String>,
    pub item_id: String,
    pub kind: ContentKind,
    pub hosting: Hosting,
    pub source_page_type: String,
    pub source_page_url: Option<String>,
    pub hidden: bool,
    pub order: i64,
    pub path: Vec<String>,
    pub captioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
pub struct Documents {
    pub documents: Vec<ExportItem>,
    pub document_sites: Vec<ExportItem>,
}

#[derive(Debug, Default, Serialize)]
pub struct Videos {
    pub video_sites: Vec<ExportItem>,
    pub video_files: Vec<ExportItem>,
}

#[derive(Debug, Default, Serialize)]
pub struct Audio {
    pub audio_sites: Vec<ExportItem>,
    pub audio_files: Vec<ExportItem>,
}

#[derive(Debug, Default, Serialize)]
pub struct Images {
    pub image_files: Vec<ExportItem>,
}

#[derive(Debug, Default, Serialize)]
pub struct Unsorted {
    pub unsorted: Vec<ExportItem>,
}

#[derive(Debug, Default, Serialize)]
pub struct ContentGroups {
    pub documents: Documents,
    pub videos: Videos,
    pub audio: Audio,
    pub images: Images,
    pub unsorted: Unsorted,
}

impl ContentGroups {
    pub fn len(&self) -> usize {
        self.documents.documents.len()
            + self.documents.document_sites.len()
            + self.videos.video_sites.len()
            + self.videos.video_files.len()
            + self.audio.audio_sites.len()
            + self.audio.audio_files.len()
            + self.images.image_files.len()
            + self.unsorted.unsorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket(&mut self, kind: ContentKind, mime_type: Option<&str>) -> &mut Vec<ExportItem> {
        match kind {
            ContentKind::Document => &mut self.documents.documents,
            ContentKind::DocumentSite | ContentKind::FileStorageSite | ContentKind::DigitalTextbook => {
                &mut self.documents.document_sites
            }
            ContentKind::VideoSite => &mut self.videos.video_sites,
            ContentKind::VideoFile => &mut self.videos.video_files,
            ContentKind::MediaEmbed if mime_type.is_some_and(|m| m.starts_with("audio")) => {
                &mut self.audio.audio_files
            }
            ContentKind::MediaEmbed => &mut self.videos.video_files,
            ContentKind::AudioSite => &mut self.audio.audio_sites,
            ContentKind::AudioFile => &mut self.audio.audio_files,
            ContentKind::ImageFile => &mut self.images.image_files,
            ContentKind::Unsorted => &mut self.unsorted.unsorted,
        }
    }
}

/// 课程内容清单，按内容类别分组
#[derive(Debug, Serialize)]
pub struct ContentExport {
    pub course_id: u64,
    pub course_url: String,
    pub content: ContentGroups,
}

impl ContentExport {
    pub fn write_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("内容清单已导出到 '{}'", path.display());
        Ok(())
    }
}

/// 遍历去重清单，为每个内容节点生成导出条目。提供保存布局时附带计划的保存路径。
pub fn extract_content(root: &CourseRoot, layout: Option<&SaveLayout>) -> ContentExport {
    let mut planned = layout.map(|layout| paths::plan_save_paths(root, layout));
    let nodes = root.tree.read();
    let mut content = ContentGroups::default();

    for (item_id, id) in root.manifest.content_view() {
        let Some(node) = nodes.get(id) else { continue };
        let Some(data) = node.as_content() else { continue };

        let source = derive::source_container(&nodes, id).map(|n| &nodes[n]);
        let item = ExportItem {
            title: node.title.clone(),
            url: data.url.clone(),
            item_id,
            kind: data.kind,
            hosting: data.hosting,
            source_page_type: source
                .and_then(Node::as_container)
                .map(|c| c.kind.as_str().to_string())
                .unwrap_or_else(|| "course".to_string()),
            source_page_url: source_page_url(source),
            hidden: derive::is_hidden(&nodes, id),
            order: derive::order(&nodes, id),
            path: derive::path_titles(&nodes, id),
            captioned: data.captioned,
            save_path: planned.as_mut().and_then(|p| p.remove(&id)),
        };
        content.bucket(data.kind, data.mime_type.as_deref()).push(item);
    }

    ContentExport {
        course_id: root.course_id,
        course_url: root.course_url.clone(),
        content,
    }
}

fn source_page_url(source: Option<&Node>) -> Option<String> {
    match source.map(|n| &n.kind) {
        Some(NodeKind::Container(c)) => c.html_url.clone(),
        _ => None,
    }
}
