// src/extractor/mod.rs

pub mod assignments;
pub mod classifier;
pub mod course;
pub mod discussions;
pub mod embedded;
pub mod files;
pub mod html;
pub mod media;
pub mod modules;
pub mod pages;
pub mod quizzes;
pub mod storage_site;

use crate::{
    cli::Subsystem,
    client::RobustClient,
    error::ApiError,
    tree::{
        ContainerKind, ContainerNode, ContentNode, NodeId, NodeKind, Registration, Visibility,
        derive_item_id,
    },
    warnings::WarningLog,
};
use async_trait::async_trait;
use classifier::ContentClassifier;
use course::CourseRoot;
use futures::{StreamExt, stream};
use log::debug;
use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};
use storage_site::SiteAdapter;

/// 一次课程爬取中所有发现函数共享的上下文
pub struct CrawlContext<'a> {
    pub root: &'a CourseRoot,
    pub client: &'a RobustClient,
    pub classifier: &'a ContentClassifier,
    pub adapters: &'a [Box<dyn SiteAdapter>],
    pub warnings: &'a WarningLog,
    pub cancellation_token: &'a AtomicBool,
    pub max_workers: usize,
}

/// 每个课程子系统对应一个爬取器
#[async_trait]
pub trait ResourceCrawler: Send + Sync {
    fn subsystem(&self) -> Subsystem;

    /// 失败只会产生警告，不会中断整个课程的爬取
    async fn crawl(&self, ctx: &CrawlContext<'_>);
}

pub fn crawler_for(subsystem: Subsystem) -> Box<dyn ResourceCrawler> {
    match subsystem {
        Subsystem::Modules => Box::new(modules::ModulesCrawler),
        Subsystem::Pages => Box::new(pages::PagesCrawler),
        Subsystem::Assignments => Box::new(assignments::AssignmentsCrawler),
        Subsystem::Discussions => Box::new(discussions::DiscussionsCrawler::discussions()),
        Subsystem::Announcements => Box::new(discussions::DiscussionsCrawler::announcements()),
        Subsystem::Quizzes => Box::new(quizzes::QuizzesCrawler),
        Subsystem::Files => Box::new(files::FilesCrawler),
        Subsystem::MediaObjects => Box::new(media::MediaObjectsCrawler),
    }
}

/// 构造容器节点所需的全部信息。HTML 正文只用于扫描，不存入树中。
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub kind: ContainerKind,
    pub native_id: String,
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub position: Option<i64>,
    pub visibility: Visibility,
    pub body: Option<String>,
}

impl ContainerSpec {
    pub fn item_id(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.native_id)
    }

    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.trim().is_empty())
    }
}

/// 从单元条目等间接入口发现容器时附带的位置与发布状态
#[derive(Debug, Clone, Copy, Default)]
pub struct Placement {
    pub position: Option<i64>,
    pub published: Option<bool>,
}

impl Placement {
    pub fn apply(&self, spec: &mut ContainerSpec) {
        if self.position.is_some() {
            spec.position = self.position;
        }
        if self.published == Some(false) {
            spec.visibility.published = false;
        }
    }
}

impl CrawlContext<'_> {
    pub fn course_id(&self) -> u64 {
        self.root.course_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::Relaxed)
    }

    /// 执行一次 API 调用。取消时不发出请求；失败记为警告并返回 None。
    pub async fn api<T, F>(&self, what: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if self.is_cancelled() {
            return None;
        }
        match call.await {
            Ok(value) => Some(value),
            Err(ApiError::Cancelled) => None,
            Err(e) => {
                self.warnings.push(format!("{}: {}", what, e));
                None
            }
        }
    }

    /// 原子地登记并挂载容器节点
    pub fn add_container(&self, parent: NodeId, spec: &ContainerSpec) -> Registration {
        let item_id = spec.item_id();
        self.root.manifest.register_with(&item_id, false, || {
            self.root.tree.attach(
                parent,
                Some(item_id.clone()),
                spec.title.clone(),
                NodeKind::Container(ContainerNode {
                    kind: spec.kind,
                    native_id: Some(spec.native_id.clone()),
                    html_url: spec.html_url.clone(),
                    position: spec.position,
                    visibility: spec.visibility,
                }),
            )
        })
    }

    /// 登记并挂载内容节点。无法推导标识的节点只挂到树上，不进入清单。
    pub fn add_content(
        &self,
        parent: NodeId,
        native_id: Option<&str>,
        title: Option<String>,
        content: ContentNode,
    ) -> Registration {
        let item_id = derive_item_id(native_id, content.url.as_deref(), title.as_deref());
        let Some(item_id) = item_id else {
            self.warnings.push(format!(
                "无法为节点 {} 下的内容推导标识，已跳过去重登记",
                parent
            ));
            return match self.root.tree.attach(parent, None, title, NodeKind::Content(content)) {
                Some(id) => Registration::New(id),
                None => Registration::Rejected,
            };
        };
        let registration = self.root.manifest.register_with(&item_id, true, || {
            self.root
                .tree
                .attach(parent, Some(item_id.clone()), title, NodeKind::Content(content))
        });
        if let Registration::Existing(node) = registration {
            debug!("资源 '{}' 已登记为节点 {}，忽略重复发现", item_id, node);
        }
        registration
    }

    /// 列表接口返回的记录可能是简略版。`detail_key` 返回 Some 时按该键重新拉取详情，
    /// 结果保持原有顺序；拉取失败时保留简略记录。
    pub async fn refetch_missing<T, K, KeyFn, F, Fut>(
        &self,
        records: Vec<T>,
        detail_key: KeyFn,
        fetch: F,
    ) -> Vec<T>
    where
        KeyFn: Fn(&T) -> Option<K>,
        F: Fn(K) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let fetch = &fetch;
        stream::iter(records.into_iter().map(|r| (detail_key(&r), r)))
            .map(|(key, record)| async move {
                match key {
                    Some(key) => fetch(key).await.unwrap_or(record),
                    None => record,
                }
            })
            .buffered(self.max_workers.max(1))
            .collect()
            .await
    }

    /// 依次挂载同一父节点下的容器 (保持顺序)，再并发扫描它们的正文
    pub async fn attach_and_scan_all(&self, parent: NodeId, specs: Vec<ContainerSpec>) -> usize {
        let mut to_scan = Vec::new();
        for spec in specs {
            if let Registration::New(id) = self.add_container(parent, &spec)
                && let Some(body) = spec.body.filter(|b| !b.trim().is_empty())
            {
                to_scan.push((id, body));
            }
        }
        let count = to_scan.len();
        stream::iter(to_scan)
            .for_each_concurrent(self.max_workers.max(1), |(id, body)| {
                embedded::scan_body(self, id, body)
            })
            .await;
        count
    }
}
