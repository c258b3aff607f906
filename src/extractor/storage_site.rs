// src/extractor/storage_site.rs

//! 第三方文件存储站点的二级爬取。目前支持 Box 的共享文件夹页面。

use super::{
    CrawlContext,
    classifier::ContentKind,
    embedded::{LinkNode, add_link_node},
};
use crate::{client::RobustClient, constants, error::ApiError, tree::NodeId};
use async_trait::async_trait;
use futures::{FutureExt, future::BoxFuture};
use log::{debug, trace};
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

const BOX_STREAM_MARKER: &str = "Box.postStreamData";

/// 站点页面中列出的一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteItem {
    pub native_id: String,
    pub name: String,
    /// 站点上的查看页面
    pub url: String,
    /// 可直接传输的地址；没有时只能生成快捷方式
    pub download_url: Option<String>,
}

#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, url: &Url) -> bool;
    async fn list_items(&self, client: &RobustClient, url: &str) -> Result<Vec<SiteItem>, ApiError>;
}

pub struct BoxAdapter;

#[async_trait]
impl SiteAdapter for BoxAdapter {
    fn name(&self) -> &'static str {
        "Box"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| h == "box.com" || h.ends_with(".box.com"))
    }

    async fn list_items(&self, client: &RobustClient, url: &str) -> Result<Vec<SiteItem>, ApiError> {
        let page = client.get_text(url).await?;
        Ok(extract_box_items(&page, url))
    }
}

pub fn default_adapters() -> Vec<Box<dyn SiteAdapter>> {
    vec![Box::new(BoxAdapter)]
}

/// 解析共享页面中的内嵌 JSON。找不到脚本或条目时返回空列表。
pub fn extract_box_items(page: &str, share_url: &str) -> Vec<SiteItem> {
    let Some(json) = find_stream_data(page) else {
        debug!("页面 '{}' 中没有找到 {}", share_url, BOX_STREAM_MARKER);
        return Vec::new();
    };
    let Some(data) = parse_with_repair(&json) else {
        debug!("页面 '{}' 的内嵌数据无法解析", share_url);
        return Vec::new();
    };
    let base = share_url
        .split(['?', '#'])
        .next()
        .unwrap_or(share_url)
        .trim_end_matches('/');

    find_items(&data)
        .into_iter()
        .flatten()
        .filter(|item| item.get("type").and_then(Value::as_str).unwrap_or("file") == "file")
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.to_string();
            let id = match item.get("id")? {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => return None,
            };
            Some(SiteItem {
                url: format!("{}/file/{}", base, id),
                download_url: box_download_url(share_url, &id),
                native_id: format!("box_{}", id),
                name,
            })
        })
        .collect()
}

/// 共享链接中单个文件的直接下载地址。链接中没有 `/s/<共享名>` 时返回 None。
pub fn box_download_url(share_url: &str, file_id: &str) -> Option<String> {
    let share = Url::parse(share_url).ok()?;
    let shared_name = share
        .path_segments()?
        .skip_while(|segment| *segment != "s")
        .nth(1)
        .filter(|name| !name.is_empty())?
        .to_string();
    let mut url = share.join("/index.php").ok()?;
    url.query_pairs_mut()
        .append_pair("rm", "box_download_shared_file")
        .append_pair("shared_name", &shared_name)
        .append_pair("file_id", &format!("f_{}", file_id));
    Some(url.to_string())
}

pub fn adapter_for<'a>(adapters: &'a [Box<dyn SiteAdapter>], url: &str) -> Option<&'a dyn SiteAdapter> {
    let parsed = Url::parse(url).ok()?;
    adapters.iter().find(|a| a.matches(&parsed)).map(|a| &**a)
}

fn find_stream_data(page: &str) -> Option<String> {
    let document = Html::parse_document(page);
    document
        .select(&SCRIPT)
        .map(|s| s.text().collect::<String>())
        .find(|text| text.contains(BOX_STREAM_MARKER))
        .and_then(|text| {
            let after_marker = &text[text.find(BOX_STREAM_MARKER)? + BOX_STREAM_MARKER.len()..];
            let after_eq = &after_marker[after_marker.find('=')? + 1..];
            Some(after_eq.trim().trim_end_matches(';').trim().to_string())
        })
}

/// 只解析第一个 JSON 值 (忽略其后的脚本内容)；被截断时最多补齐若干个右花括号
fn parse_with_repair(raw: &str) -> Option<Value> {
    let mut candidate = raw.to_string();
    for attempt in 0..=constants::MAX_BRACE_REPAIR {
        match serde_json::Deserializer::from_str(&candidate).into_iter::<Value>().next() {
            Some(Ok(value)) => {
                if attempt > 0 {
                    trace!("补齐 {} 个右花括号后解析成功", attempt);
                }
                return Some(value);
            }
            Some(Err(e)) if e.is_eof() => candidate.push('}'),
            _ => return None,
        }
    }
    None
}

/// 递归寻找由带 `name` 的对象组成的 `items` 数组
fn find_items(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("items")
                && items.iter().any(|i| i.get("name").is_some())
            {
                return Some(items);
            }
            map.values().find_map(find_items)
        }
        Value::Array(values) => values.iter().find_map(find_items),
        _ => None,
    }
}

/// 把存储站点页面中的文件挂到站点节点下。条目按文件名重新分类，不再继续展开。
pub fn expand_site<'a>(ctx: &'a CrawlContext<'a>, site: NodeId, url: &str) -> BoxFuture<'a, ()> {
    let url = url.to_string();
    async move {
        let Some(adapter) = adapter_for(ctx.adapters, &url) else {
            trace!("没有适配 '{}' 的站点解析器", url);
            return;
        };
        let what = format!("读取 {} 页面 '{}'", adapter.name(), url);
        let Some(items) = ctx.api(&what, adapter.list_items(ctx.client, &url)).await else {
            return;
        };
        debug!("{} 页面 '{}' 中发现 {} 个文件", adapter.name(), url, items.len());
        for item in items {
            if ctx.is_cancelled() {
                return;
            }
            // 没有直接下载地址的条目只能在站点上查看
            let kind = match item.download_url {
                Some(_) => ctx.classifier.classify(None, Some(&item.name)),
                None => ContentKind::FileStorageSite,
            };
            add_link_node(
                ctx,
                site,
                LinkNode {
                    url: item.url,
                    download_url: item.download_url,
                    title: Some(item.name),
                    native_id: Some(item.native_id),
                    kind,
                },
            );
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHARE: &str = "https://app.box.com/s/abc123";

    fn page(script: &str) -> String {
        format!(
            "<html><head><script>var x = 1;</script><script>{}</script></head><body></body></html>",
            script
        )
    }

    #[test]
    fn test_extracts_file_items() {
        let html = page(
            r#"Box.postStreamData = {"/app-api/enduserapp/shared-folder": {"items": [
                {"id": 11, "type": "file", "name": "Syllabus.pdf"},
                {"id": 12, "type": "folder", "name": "Extra"},
                {"id": 13, "type": "file", "name": "lecture.mp4"}
            ]}};"#,
        );
        let items = extract_box_items(&html, SHARE);
        assert_eq!(
            items,
            vec![
                SiteItem {
                    native_id: "box_11".into(),
                    name: "Syllabus.pdf".into(),
                    url: "https://app.box.com/s/abc123/file/11".into(),
                    download_url: Some(
                        "https://app.box.com/index.php?rm=box_download_shared_file&shared_name=abc123&file_id=f_11"
                            .into()
                    ),
                },
                SiteItem {
                    native_id: "box_13".into(),
                    name: "lecture.mp4".into(),
                    url: "https://app.box.com/s/abc123/file/13".into(),
                    download_url: Some(
                        "https://app.box.com/index.php?rm=box_download_shared_file&shared_name=abc123&file_id=f_13"
                            .into()
                    ),
                },
            ]
        );
    }

    #[test]
    fn test_repairs_truncated_braces() {
        let html = page(r#"Box.postStreamData = {"shared": {"items": [{"id": 1, "name": "a.docx"}]"#);
        let items = extract_box_items(&html, SHARE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "a.docx");
    }

    #[test]
    fn test_missing_script_or_items_yields_nothing() {
        assert!(extract_box_items(&page("var y = 2;"), SHARE).is_empty());
        assert!(extract_box_items(&page(r#"Box.postStreamData = {"other": []};"#), SHARE).is_empty());
        assert!(extract_box_items(&page("Box.postStreamData = not json;"), SHARE).is_empty());
    }

    #[test]
    fn test_download_url_needs_shared_name() {
        assert_eq!(
            box_download_url("https://uni.app.box.com/s/xyz789?page=2", "5").as_deref(),
            Some("https://uni.app.box.com/index.php?rm=box_download_shared_file&shared_name=xyz789&file_id=f_5")
        );
        assert_eq!(box_download_url("https://app.box.com/folder/123", "5"), None);
        assert_eq!(box_download_url("https://app.box.com/s/", "5"), None);
    }

    #[test]
    fn test_box_adapter_matches_hosts() {
        let adapter = BoxAdapter;
        assert!(adapter.matches(&Url::parse(SHARE).unwrap()));
        assert!(adapter.matches(&Url::parse("https://box.com/s/x").unwrap()));
        assert!(!adapter.matches(&Url::parse("https://dropbox.com/s/x").unwrap()));
    }
}
