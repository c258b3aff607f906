// src/extractor/pages.rs

use super::{ContainerSpec, CrawlContext, ResourceCrawler};
use crate::{
    cli::Subsystem,
    models::api::PageRecord,
    tree::{ContainerKind, ROOT, Visibility},
};
use async_trait::async_trait;
use log::info;

pub struct PagesCrawler;

/// 页面的原生标识优先用数字 id，没有时退回 slug
fn page_native_id(record: &PageRecord) -> Option<String> {
    record
        .page_id
        .map(|id| id.to_string())
        .or_else(|| record.url.clone())
}

pub fn to_spec(record: PageRecord) -> ContainerSpec {
    ContainerSpec {
        kind: ContainerKind::Page,
        native_id: page_native_id(&record).unwrap_or_default(),
        title: record.title,
        html_url: record.html_url,
        position: None,
        visibility: Visibility {
            published: record.published.unwrap_or(true),
            hide_from_students: record.hide_from_students.unwrap_or(false),
            locked: record.locked_for_user.unwrap_or(false),
            ..Default::default()
        },
        body: record.body,
    }
}

#[async_trait]
impl ResourceCrawler for PagesCrawler {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Pages
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let Some(pages) = ctx.api("获取页面列表", ctx.client.pages(course_id)).await else {
            return;
        };
        info!("课程 {} 共有 {} 个页面", course_id, pages.len());

        // 列表接口不返回正文，需要逐个拉取详情
        let pages = ctx
            .refetch_missing(
                pages,
                |page| {
                    let known = page_native_id(page)
                        .is_some_and(|id| ctx.root.manifest.contains(&format!("page_{}", id)));
                    if page.body.is_none() && !known { page.url.clone() } else { None }
                },
                move |slug: String| async move {
                    let what = format!("获取页面 '{}'", slug);
                    ctx.api(&what, ctx.client.page(course_id, &slug)).await
                },
            )
            .await;

        let specs = pages
            .into_iter()
            .filter(|p| page_native_id(p).is_some())
            .map(to_spec)
            .collect();
        ctx.attach_and_scan_all(ROOT, specs).await;
    }
}
