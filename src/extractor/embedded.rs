// src/extractor/embedded.rs

//! 正文中的嵌套内容发现: 普通链接走分类器，指回课程资源的链接走 data-api 展开。

use super::{
    CrawlContext, ContainerSpec, Placement, assignments, classifier::ContentKind, discussions,
    files, html, pages, quizzes, storage_site,
};
use crate::{
    client::RobustClient,
    tree::{ContainerKind, ContentNode, Hosting, NodeId, Registration},
    utils,
};
use futures::{FutureExt, future::BoxFuture};
use log::{debug, trace};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static COURSE_RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/courses/(\d+)/(pages|assignments|discussion_topics|quizzes|modules|files)/([^/?#]+)")
        .unwrap()
});
static LMS_FILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/files/(\d+)").unwrap());
static MEDIA_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/media_objects(?:_iframe)?/([A-Za-z0-9_-]+)").unwrap());
static MEDIA_ATTACHMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/media_attachments(?:_iframe)?/(\d+)").unwrap());

/// 正文中指向课程资源的链接
#[derive(Debug, PartialEq, Eq)]
struct ResourceTarget {
    course_id: u64,
    collection: String,
    key: String,
}

impl ResourceTarget {
    fn parse(url: &str) -> Option<Self> {
        let path = Url::parse(url).map(|u| u.path().to_string()).ok()?;
        let caps = COURSE_RESOURCE_RE.captures(&path)?;
        Some(Self {
            course_id: caps[1].parse().ok()?,
            collection: caps[2].to_string(),
            key: caps[3].to_string(),
        })
    }
}

pub fn hosting_for(client: &RobustClient, url: &str) -> Hosting {
    match Url::parse(url) {
        Ok(parsed) if client.is_lms_url(&parsed) => {
            if MEDIA_OBJECT_RE.is_match(parsed.path()) || MEDIA_ATTACHMENT_RE.is_match(parsed.path()) {
                Hosting::MediaService
            } else {
                Hosting::Lms
            }
        }
        _ => Hosting::External,
    }
}

/// LMS 文件或媒体链接中携带的原生 id
pub fn native_id_from_url(client: &RobustClient, url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !client.is_lms_url(&parsed) {
        return None;
    }
    let path = parsed.path();
    MEDIA_ATTACHMENT_RE
        .captures(path)
        .or_else(|| LMS_FILE_RE.captures(path))
        .or_else(|| MEDIA_OBJECT_RE.captures(path))
        .map(|caps| caps[1].to_string())
}

/// 扫描一段 HTML 正文，按出现顺序把发现的内容挂到 `parent` 下
pub fn scan_body<'a>(ctx: &'a CrawlContext<'a>, parent: NodeId, body: String) -> BoxFuture<'a, ()> {
    async move {
        let links = html::extract_links(&body, &ctx.client.config().base_url);
        trace!("节点 {} 的正文中发现 {} 个链接", parent, links.len());
        for link in links {
            if ctx.is_cancelled() {
                return;
            }
            if ctx.classifier.is_resource_link(&link.url) {
                expand_resource(ctx, parent, link.url, link.text, Placement::default()).await;
            } else {
                discover_link(ctx, parent, link.url, link.text).await;
            }
        }
    }
    .boxed()
}

/// 挂载容器并扫描其正文；已登记的容器不会被重复扫描
pub fn attach_and_scan<'a>(
    ctx: &'a CrawlContext<'a>,
    parent: NodeId,
    spec: ContainerSpec,
) -> BoxFuture<'a, Option<NodeId>> {
    async move {
        match ctx.add_container(parent, &spec) {
            Registration::New(id) => {
                if let Some(body) = spec.body.filter(|b| !b.trim().is_empty()) {
                    scan_body(ctx, id, body).await;
                }
                Some(id)
            }
            _ => None,
        }
    }
    .boxed()
}

/// 拉取链接指向的课程资源，作为容器 (文件则作为内容) 挂载。
/// 单元不在此展开；其他课程的链接按普通内容处理。
pub fn expand_resource<'a>(
    ctx: &'a CrawlContext<'a>,
    parent: NodeId,
    url: String,
    text: Option<String>,
    placement: Placement,
) -> BoxFuture<'a, ()> {
    async move {
        let Some(target) = ResourceTarget::parse(&url) else {
            discover_link(ctx, parent, url, text).await;
            return;
        };
        if target.course_id != ctx.course_id() {
            debug!("链接 '{}' 属于其他课程，按普通内容处理", url);
            discover_link(ctx, parent, url, text).await;
            return;
        }
        let course_id = target.course_id;

        if target.collection == "pages" {
            let what = format!("获取页面 '{}'", target.key);
            if let Some(page) = ctx.api(&what, ctx.client.page(course_id, &target.key)).await {
                let mut spec = pages::to_spec(page);
                placement.apply(&mut spec);
                attach_and_scan(ctx, parent, spec).await;
            }
            return;
        }
        if target.collection == "modules" {
            debug!("跳过指向单元的链接 '{}'", url);
            return;
        }

        let Ok(id) = target.key.parse::<u64>() else {
            ctx.warnings.push(format!("无法识别的资源链接 '{}'", url));
            return;
        };
        let already_known = |kind: ContainerKind| {
            ctx.root
                .manifest
                .contains(&format!("{}_{}", kind.as_str(), id))
        };

        match target.collection.as_str() {
            "assignments" if !already_known(ContainerKind::Assignment) => {
                let what = format!("获取作业 {}", id);
                if let Some(record) = ctx.api(&what, ctx.client.assignment(course_id, id)).await {
                    let mut spec = assignments::to_spec(record);
                    placement.apply(&mut spec);
                    attach_and_scan(ctx, parent, spec).await;
                }
            }
            "discussion_topics" if !already_known(ContainerKind::Discussion) => {
                let what = format!("获取讨论 {}", id);
                if let Some(record) = ctx.api(&what, ctx.client.discussion(course_id, id)).await {
                    let mut spec = discussions::to_spec(record, ContainerKind::Discussion);
                    placement.apply(&mut spec);
                    attach_and_scan(ctx, parent, spec).await;
                }
            }
            "quizzes" if !already_known(ContainerKind::Quiz) => {
                let what = format!("获取测验 {}", id);
                if let Some(record) = ctx.api(&what, ctx.client.quiz(course_id, id)).await {
                    let mut spec = quizzes::to_spec(record);
                    placement.apply(&mut spec);
                    attach_and_scan(ctx, parent, spec).await;
                }
            }
            "files" if !ctx.root.manifest.contains(&id.to_string()) => {
                let what = format!("获取文件 {}", id);
                match ctx.api(&what, ctx.client.file(course_id, id)).await {
                    Some(record) => {
                        files::add_file(ctx, parent, record, placement.published);
                    }
                    // 拿不到文件记录时，正文里的文件页面链接仍按普通链接登记
                    None if !url.contains("/api/v1/") => {
                        discover_link(ctx, parent, url, text).await;
                    }
                    None => {}
                }
            }
            _ => trace!("资源 '{}' 已登记，跳过展开", url),
        }
    }
    .boxed()
}

/// 一个已确定类型的链接节点
pub struct LinkNode {
    pub url: String,
    pub download_url: Option<String>,
    pub title: Option<String>,
    pub native_id: Option<String>,
    pub kind: ContentKind,
}

/// 构造并登记链接对应的内容节点，不做任何展开
pub fn add_link_node(ctx: &CrawlContext<'_>, parent: NodeId, link: LinkNode) -> Registration {
    let title = link
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| utils::filename_from_url(&link.url));
    let mut content = ContentNode::new(link.kind, Some(link.url.clone()), hosting_for(ctx.client, &link.url));
    content.download_url = link.download_url;
    content.file_name = title
        .clone()
        .filter(|t| utils::has_file_extension(t))
        .or_else(|| utils::filename_from_url(&link.url).filter(|n| utils::has_file_extension(n)));
    ctx.add_content(parent, link.native_id.as_deref(), title, content)
}

/// 分类一个普通链接并登记；文件存储站点会继续交给站点适配器展开
pub fn discover_link<'a>(
    ctx: &'a CrawlContext<'a>,
    parent: NodeId,
    url: String,
    title: Option<String>,
) -> BoxFuture<'a, Option<NodeId>> {
    async move {
        // 有适配器的站点总是按存储站点处理
        let kind = match storage_site::adapter_for(ctx.adapters, &url) {
            Some(_) => ContentKind::FileStorageSite,
            None => ctx.classifier.classify(Some(&url), title.as_deref()),
        };
        let native_id = native_id_from_url(ctx.client, &url);
        let link = LinkNode {
            url: url.clone(),
            download_url: None,
            title,
            native_id,
            kind,
        };
        match add_link_node(ctx, parent, link) {
            Registration::New(id) => {
                if kind == ContentKind::FileStorageSite {
                    storage_site::expand_site(ctx, id, &url).await;
                }
                Some(id)
            }
            _ => None,
        }
    }
    .boxed()
}
