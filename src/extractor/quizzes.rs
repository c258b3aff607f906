// src/extractor/quizzes.rs

use super::{ContainerSpec, CrawlContext, ResourceCrawler};
use crate::{
    cli::Subsystem,
    models::api::QuizRecord,
    tree::{ContainerKind, ROOT, Visibility},
};
use async_trait::async_trait;
use log::info;

pub struct QuizzesCrawler;

pub fn to_spec(record: QuizRecord) -> ContainerSpec {
    ContainerSpec {
        kind: ContainerKind::Quiz,
        native_id: record.id.to_string(),
        title: record.title,
        html_url: record.html_url,
        position: None,
        visibility: Visibility {
            published: record.published.unwrap_or(true),
            locked: record.locked_for_user.unwrap_or(false),
            ..Default::default()
        },
        body: record.description,
    }
}

#[async_trait]
impl ResourceCrawler for QuizzesCrawler {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Quizzes
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let Some(quizzes) = ctx.api("获取测验列表", ctx.client.quizzes(course_id)).await else {
            return;
        };
        info!("课程 {} 共有 {} 个测验", course_id, quizzes.len());

        let quizzes = ctx
            .refetch_missing(
                quizzes,
                |q| q.description.is_none().then_some(q.id),
                move |id: u64| async move {
                    let what = format!("获取测验 {}", id);
                    ctx.api(&what, ctx.client.quiz(course_id, id)).await
                },
            )
            .await;

        let specs = quizzes.into_iter().map(to_spec).collect();
        ctx.attach_and_scan_all(ROOT, specs).await;
    }
}
