// src/extractor/course.rs

use super::{
    CrawlContext, ResourceCrawler, classifier::ContentClassifier, crawler_for, embedded,
    storage_site::SiteAdapter,
};
use crate::{
    cli::Subsystem,
    client::RobustClient,
    error::*,
    tree::{Manifest, ROOT, Tree},
};
use futures::future::{BoxFuture, join_all};
use itertools::Itertools;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次爬取的根: 持有课程信息、结构树与去重清单
pub struct CourseRoot {
    pub course_id: u64,
    pub course_url: String,
    /// 只有成功获取课程信息后才为 true
    pub exists: bool,
    pub title: Option<String>,
    pub tree: Tree,
    pub manifest: Manifest,
}

impl CourseRoot {
    pub fn new(course_id: u64, course_url: String, title: Option<String>) -> Self {
        Self {
            course_id,
            course_url,
            exists: false,
            tree: Tree::new(title.clone()),
            title,
            manifest: Manifest::new(),
        }
    }
}

pub struct CourseCrawler<'a> {
    pub client: &'a RobustClient,
    pub classifier: &'a ContentClassifier,
    /// 展开存储站点链接时依次尝试的适配器
    pub adapters: &'a [Box<dyn SiteAdapter>],
    pub warnings: &'a crate::warnings::WarningLog,
    pub cancellation_token: &'a AtomicBool,
    pub subsystems: &'a [Subsystem],
}

impl CourseCrawler<'_> {
    /// 获取课程并爬取所有启用的子系统。课程本身无法获取时整个爬取失败。
    pub async fn crawl(&self, course_id: u64) -> AppResult<CourseRoot> {
        if self.cancellation_token.load(Ordering::Relaxed) {
            return Err(AppError::UserInterrupt);
        }
        let course = self.client.course(course_id).await.map_err(|e| {
            error!("获取课程 {} 失败: {}", course_id, e);
            AppError::CourseNotFound(course_id.to_string())
        })?;

        let course_url = format!(
            "{}/courses/{}",
            self.client.config().base_url.as_str().trim_end_matches('/'),
            course_id
        );
        let title = course.name.clone().or(course.course_code.clone());
        info!("课程 {} '{}' 获取成功", course_id, title.as_deref().unwrap_or(""));

        let mut root = CourseRoot::new(course_id, course_url, title);
        root.exists = true;

        {
            let ctx = CrawlContext {
                root: &root,
                client: self.client,
                classifier: self.classifier,
                adapters: self.adapters,
                warnings: self.warnings,
                cancellation_token: self.cancellation_token,
                max_workers: self.client.config().max_workers,
            };

            let crawlers: Vec<Box<dyn ResourceCrawler>> =
                self.subsystems.iter().copied().unique().map(crawler_for).collect();
            let (modules, others): (Vec<_>, Vec<_>) = crawlers
                .iter()
                .partition(|c| c.subsystem() == Subsystem::Modules);

            // 单元先爬完，使单元层级优先成为资源的规范位置
            for crawler in modules {
                crawler.crawl(&ctx).await;
            }

            let mut tasks: Vec<BoxFuture<'_, ()>> = others.iter().map(|c| c.crawl(&ctx)).collect();
            if let Some(body) = course.syllabus_body.filter(|b| !b.trim().is_empty()) {
                tasks.push(embedded::scan_body(&ctx, ROOT, body));
            }
            join_all(tasks).await;
        }

        if self.cancellation_token.load(Ordering::Relaxed) {
            return Err(AppError::UserInterrupt);
        }
        debug!(
            "课程 {} 爬取完成: {} 个节点, {} 个登记项, {} 次重复发现",
            course_id,
            root.tree.len(),
            root.manifest.len(),
            root.manifest.duplicate_count()
        );
        Ok(root)
    }
}
