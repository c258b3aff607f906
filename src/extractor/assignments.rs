// src/extractor/assignments.rs

use super::{ContainerSpec, CrawlContext, ResourceCrawler};
use crate::{
    cli::Subsystem,
    models::api::AssignmentRecord,
    tree::{ContainerKind, ROOT, Visibility},
};
use async_trait::async_trait;
use log::info;

pub struct AssignmentsCrawler;

pub fn to_spec(record: AssignmentRecord) -> ContainerSpec {
    ContainerSpec {
        kind: ContainerKind::Assignment,
        native_id: record.id.to_string(),
        title: record.name,
        html_url: record.html_url,
        position: record.position,
        visibility: Visibility {
            published: record.published.unwrap_or(true),
            locked: record.locked_for_user.unwrap_or(false),
            ..Default::default()
        },
        body: record.description,
    }
}

#[async_trait]
impl ResourceCrawler for AssignmentsCrawler {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Assignments
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let Some(assignments) = ctx.api("获取作业列表", ctx.client.assignments(course_id)).await else {
            return;
        };
        info!("课程 {} 共有 {} 个作业", course_id, assignments.len());

        let assignments = ctx
            .refetch_missing(
                assignments,
                |a| a.description.is_none().then_some(a.id),
                move |id: u64| async move {
                    let what = format!("获取作业 {}", id);
                    ctx.api(&what, ctx.client.assignment(course_id, id)).await
                },
            )
            .await;

        let specs = assignments.into_iter().map(to_spec).collect();
        ctx.attach_and_scan_all(ROOT, specs).await;
    }
}
