// src/extractor/html.rs

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IFRAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("iframe[src]").unwrap());
static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static VIDEO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("video").unwrap());
static VIDEO_SOURCE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("source[src]").unwrap());
static DATA_API: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-api-endpoint]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Anchor,
    Iframe,
    Image,
    Video,
    DataApi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: String,
    pub text: Option<String>,
    pub source: LinkSource,
}

/// 按 锚点 → iframe → 图片 → 视频 → data-api 的顺序提取 HTML 片段中的引用，
/// 相对地址基于 `base` 解析，同一地址只保留第一次出现。
pub fn extract_links(html: &str, base: &Url) -> Vec<ExtractedLink> {
    let fragment = Html::parse_fragment(html);
    let mut links = Vec::new();

    // 带 data-api-endpoint 的锚点只在最后一轮以 API 地址出现一次
    for el in fragment.select(&ANCHOR) {
        if el.value().attr("data-api-endpoint").is_some() {
            continue;
        }
        push(&mut links, base, el.value().attr("href"), inner_text(&el), LinkSource::Anchor);
    }
    for el in fragment.select(&IFRAME) {
        push(&mut links, base, el.value().attr("src"), attr_text(&el, "title"), LinkSource::Iframe);
    }
    for el in fragment.select(&IMAGE) {
        push(&mut links, base, el.value().attr("src"), attr_text(&el, "alt"), LinkSource::Image);
    }
    for video in fragment.select(&VIDEO) {
        let title = attr_text(&video, "title");
        push(&mut links, base, video.value().attr("src"), title.clone(), LinkSource::Video);
        for source in video.select(&VIDEO_SOURCE) {
            push(&mut links, base, source.value().attr("src"), title.clone(), LinkSource::Video);
        }
    }
    for el in fragment.select(&DATA_API) {
        let text = inner_text(&el).or_else(|| attr_text(&el, "title"));
        push(&mut links, base, el.value().attr("data-api-endpoint"), text, LinkSource::DataApi);
    }

    links.into_iter().unique_by(|l| l.url.clone()).collect()
}

fn push(
    links: &mut Vec<ExtractedLink>,
    base: &Url,
    raw: Option<&str>,
    text: Option<String>,
    source: LinkSource,
) {
    if let Some(url) = raw.and_then(|r| resolve_link(r, base)) {
        links.push(ExtractedLink { url, text, source });
    }
}

fn inner_text(el: &ElementRef) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().join(" ");
    (!text.is_empty()).then_some(text)
}

fn attr_text(el: &ElementRef, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"].iter().any(|s| lower.starts_with(s)) {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}
