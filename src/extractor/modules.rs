// src/extractor/modules.rs

use super::{
    ContainerSpec, CrawlContext, Placement, ResourceCrawler,
    embedded::{discover_link, expand_resource},
};
use crate::{
    cli::Subsystem,
    constants::api::item_types,
    models::api::ModuleRecord,
    tree::{ContainerKind, NodeId, ROOT, Registration, Visibility},
};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use log::{debug, info};

pub struct ModulesCrawler;

fn module_spec(record: &ModuleRecord) -> ContainerSpec {
    ContainerSpec {
        kind: ContainerKind::Module,
        native_id: record.id.to_string(),
        title: record.name.clone(),
        html_url: None,
        position: record.position,
        visibility: Visibility {
            published: record.published.unwrap_or(true),
            ..Default::default()
        },
        body: None,
    }
}

/// 逐条处理单元条目，保证条目在单元下的顺序
async fn crawl_items(ctx: &CrawlContext<'_>, node: NodeId, module: ModuleRecord) {
    let items_url = module.items_url.clone().unwrap_or_else(|| {
        ctx.client
            .api_url(&format!("courses/{}/modules/{}/items", ctx.course_id(), module.id))
    });
    let what = format!(
        "获取单元 '{}' 的条目",
        module.name.as_deref().unwrap_or("(无标题)")
    );
    let Some(items) = ctx.api(&what, ctx.client.module_items(&items_url)).await else {
        return;
    };

    for item in items {
        if ctx.is_cancelled() {
            return;
        }
        let placement = Placement {
            position: item.position,
            published: item.published,
        };
        match item.item_type.as_str() {
            item_types::PAGE
            | item_types::ASSIGNMENT
            | item_types::DISCUSSION
            | item_types::QUIZ
            | item_types::FILE => match item.url.or(item.html_url) {
                Some(url) => expand_resource(ctx, node, url, item.title, placement).await,
                None => ctx
                    .warnings
                    .push(format!("单元条目 {} ({}) 缺少链接", item.id, item.item_type)),
            },
            item_types::EXTERNAL_URL | item_types::EXTERNAL_TOOL => {
                if let Some(url) = item.external_url.or(item.html_url) {
                    discover_link(ctx, node, url, item.title).await;
                }
            }
            item_types::SUB_HEADER => {}
            other => debug!("忽略未知类型的单元条目 '{}'", other),
        }
    }
}

#[async_trait]
impl ResourceCrawler for ModulesCrawler {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Modules
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let Some(modules) = ctx.api("获取单元列表", ctx.client.modules(course_id)).await else {
            return;
        };
        info!("课程 {} 共有 {} 个单元", course_id, modules.len());

        let mut attached = Vec::new();
        for module in modules {
            if let Registration::New(node) = ctx.add_container(ROOT, &module_spec(&module)) {
                attached.push((node, module));
            }
        }
        stream::iter(attached)
            .for_each_concurrent(ctx.max_workers.max(1), |(node, module)| {
                crawl_items(ctx, node, module)
            })
            .await;
    }
}
