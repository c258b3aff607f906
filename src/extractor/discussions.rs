// src/extractor/discussions.rs

use super::{ContainerSpec, CrawlContext, ResourceCrawler};
use crate::{
    cli::Subsystem,
    models::api::DiscussionRecord,
    tree::{ContainerKind, ROOT, Visibility},
};
use async_trait::async_trait;
use log::info;

/// 讨论与公告共用同一套接口，只是列表的过滤条件不同
pub struct DiscussionsCrawler {
    kind: ContainerKind,
}

impl DiscussionsCrawler {
    pub fn discussions() -> Self {
        Self { kind: ContainerKind::Discussion }
    }

    pub fn announcements() -> Self {
        Self { kind: ContainerKind::Announcement }
    }
}

pub fn to_spec(record: DiscussionRecord, kind: ContainerKind) -> ContainerSpec {
    ContainerSpec {
        kind,
        native_id: record.id.to_string(),
        title: record.title,
        html_url: record.html_url,
        position: record.position,
        visibility: Visibility {
            published: record.published.unwrap_or(true),
            locked: record.locked.unwrap_or(false) || record.locked_for_user.unwrap_or(false),
            ..Default::default()
        },
        body: record.message,
    }
}

#[async_trait]
impl ResourceCrawler for DiscussionsCrawler {
    fn subsystem(&self) -> Subsystem {
        match self.kind {
            ContainerKind::Announcement => Subsystem::Announcements,
            _ => Subsystem::Discussions,
        }
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let records = match self.kind {
            ContainerKind::Announcement => {
                ctx.api("获取公告列表", ctx.client.announcements(course_id)).await
            }
            _ => ctx.api("获取讨论列表", ctx.client.discussions(course_id)).await,
        };
        let Some(records) = records else { return };
        info!("课程 {} 共有 {} 个{}", course_id, records.len(), self.kind.as_str());

        let records = ctx
            .refetch_missing(
                records,
                |d| d.message.is_none().then_some(d.id),
                move |id: u64| async move {
                    let what = format!("获取讨论 {}", id);
                    ctx.api(&what, ctx.client.discussion(course_id, id)).await
                },
            )
            .await;

        let kind = self.kind;
        let specs = records.into_iter().map(|r| to_spec(r, kind)).collect();
        ctx.attach_and_scan_all(ROOT, specs).await;
    }
}
