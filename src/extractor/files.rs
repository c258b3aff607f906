// src/extractor/files.rs

use super::{ContainerSpec, CrawlContext, ResourceCrawler};
use crate::{
    cli::Subsystem,
    models::api::{FileRecord, FolderRecord},
    tree::{ContainerKind, ContentNode, Hosting, NodeId, ROOT, Registration, Visibility},
    utils,
};
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;

pub struct FilesCrawler;

fn folder_spec(record: &FolderRecord) -> ContainerSpec {
    ContainerSpec {
        kind: ContainerKind::Folder,
        native_id: record.id.to_string(),
        title: record.name.clone(),
        html_url: None,
        position: record.position,
        visibility: Visibility {
            hidden_for_user: record.hidden_for_user.unwrap_or(false),
            hide_from_students: record.hidden.unwrap_or(false),
            locked: record.locked.unwrap_or(false),
            ..Default::default()
        },
        body: None,
    }
}

/// 把一条文件记录作为内容节点挂到 `parent` 下
pub fn add_file(
    ctx: &CrawlContext<'_>,
    parent: NodeId,
    record: FileRecord,
    published: Option<bool>,
) -> Registration {
    let base = ctx.client.config().base_url.as_str().trim_end_matches('/').to_string();
    let page_url = format!("{}/courses/{}/files/{}", base, ctx.course_id(), record.id);
    let title = record.display_name.clone().or_else(|| record.filename.clone());
    // 显示名不一定带扩展名，分类时优先用真实文件名
    let name_for_kind = title
        .clone()
        .filter(|t| utils::has_file_extension(t))
        .or_else(|| record.filename.clone());
    let kind = ctx
        .classifier
        .classify(record.url.as_deref().or(Some(&page_url)), name_for_kind.as_deref());

    let mut content = ContentNode::new(kind, Some(page_url), Hosting::Lms);
    content.download_url = record.url;
    content.file_name = record.filename.or_else(|| record.display_name.clone());
    content.mime_type = record.content_type;
    content.visibility = Visibility {
        hidden_for_user: record.hidden_for_user.unwrap_or(false),
        published: published.unwrap_or(true),
        hide_from_students: record.hidden.unwrap_or(false),
        locked: record.locked.unwrap_or(false) || record.locked_for_user.unwrap_or(false),
    };
    content.source = record.extra;
    if let Some(size) = record.size {
        content.source.insert("size".into(), size.into());
    }

    ctx.add_content(parent, Some(&record.id.to_string()), title, content)
}

/// 先挂载父目录，再挂载子目录
fn sort_by_depth(folders: &mut [FolderRecord]) {
    folders.sort_by_key(|f| {
        f.full_name
            .as_deref()
            .map(|n| n.matches('/').count())
            .unwrap_or(usize::MAX)
    });
}

#[async_trait]
impl ResourceCrawler for FilesCrawler {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Files
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let mut folders = ctx
            .api("获取文件夹列表", ctx.client.folders(course_id))
            .await
            .unwrap_or_default();
        sort_by_depth(&mut folders);

        let mut folder_nodes: HashMap<u64, NodeId> = HashMap::new();
        for folder in &folders {
            let parent = folder
                .parent_folder_id
                .and_then(|id| folder_nodes.get(&id).copied())
                .unwrap_or(ROOT);
            match ctx.add_container(parent, &folder_spec(folder)) {
                Registration::New(node) | Registration::Existing(node) => {
                    folder_nodes.insert(folder.id, node);
                }
                Registration::Rejected => {}
            }
        }

        let Some(files) = ctx.api("获取文件列表", ctx.client.files(course_id)).await else {
            return;
        };
        info!(
            "课程 {} 共有 {} 个文件夹、{} 个文件",
            course_id,
            folders.len(),
            files.len()
        );
        for file in files {
            if ctx.is_cancelled() {
                return;
            }
            let parent = file
                .folder_id
                .and_then(|id| folder_nodes.get(&id).copied())
                .unwrap_or(ROOT);
            add_file(ctx, parent, file, None);
        }
    }
}
