// src/extractor/media.rs

use super::{CrawlContext, ResourceCrawler, classifier::ContentKind};
use crate::{
    cli::Subsystem,
    constants::api::media_types,
    models::api::MediaObjectRecord,
    tree::{ContentNode, Hosting, ROOT},
};
use async_trait::async_trait;
use log::info;

pub struct MediaObjectsCrawler;

fn to_content(base: &str, record: MediaObjectRecord) -> (Option<String>, ContentNode) {
    let kind = match record.media_type.as_deref() {
        Some(media_types::AUDIO) => ContentKind::AudioFile,
        _ => ContentKind::VideoFile,
    };
    let title = record.display_title().map(str::to_string);
    let page_url = format!("{}/media_objects_iframe/{}", base, record.media_id);
    let source = record.best_source();

    let mut content = ContentNode::new(kind, Some(page_url), Hosting::MediaService);
    content.download_url = source.and_then(|s| s.url.clone());
    content.mime_type = source.and_then(|s| s.content_type.clone());
    content.captioned = !record.media_tracks.is_empty();
    content.source = record.extra;
    (title, content)
}

#[async_trait]
impl ResourceCrawler for MediaObjectsCrawler {
    fn subsystem(&self) -> Subsystem {
        Subsystem::MediaObjects
    }

    async fn crawl(&self, ctx: &CrawlContext<'_>) {
        let course_id = ctx.course_id();
        let Some(objects) = ctx.api("获取媒体列表", ctx.client.media_objects(course_id)).await else {
            return;
        };
        info!("课程 {} 共有 {} 个媒体对象", course_id, objects.len());

        let base = ctx.client.config().base_url.as_str().trim_end_matches('/').to_string();
        for record in objects {
            let media_id = record.media_id.clone();
            let (title, content) = to_content(&base, record);
            ctx.add_content(ROOT, Some(&media_id), title, content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_object_to_content() {
        let record: MediaObjectRecord = serde_json::from_value(serde_json::json!({
            "media_id": "m-abc",
            "title": "raw.mp3",
            "user_entered_title": "Episode 1",
            "media_type": "audio",
            "media_sources": [{"url": "https://cdn/ep1.mp3", "content_type": "audio/mpeg", "bitrate": "128"}],
            "media_tracks": [{"kind": "subtitles", "locale": "en"}]
        }))
        .unwrap();
        let (title, content) = to_content("https://lms.example.edu", record);
        assert_eq!(title.as_deref(), Some("Episode 1"));
        assert_eq!(content.kind, ContentKind::AudioFile);
        assert_eq!(content.hosting, Hosting::MediaService);
        assert_eq!(content.download_url.as_deref(), Some("https://cdn/ep1.mp3"));
        assert_eq!(content.url.as_deref(), Some("https://lms.example.edu/media_objects_iframe/m-abc"));
        assert!(content.captioned);
    }
}
