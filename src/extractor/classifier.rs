// src/extractor/classifier.rs

use crate::{
    config::PatternConfig,
    error::{AppError, AppResult},
    utils,
};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Document,
    DocumentSite,
    VideoFile,
    VideoSite,
    AudioFile,
    AudioSite,
    ImageFile,
    FileStorageSite,
    DigitalTextbook,
    /// LMS 媒体服务的内嵌播放器
    MediaEmbed,
    Unsorted,
}

impl ContentKind {
    /// 站点类内容只能以快捷方式保存
    pub fn is_site(&self) -> bool {
        matches!(
            self,
            ContentKind::DocumentSite
                | ContentKind::VideoSite
                | ContentKind::AudioSite
                | ContentKind::FileStorageSite
                | ContentKind::DigitalTextbook
                | ContentKind::MediaEmbed
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    /// 匹配 URL 路径，以及带扩展名的标题
    Extension,
    /// 匹配完整 URL
    Location,
}

struct Rule {
    kind: ContentKind,
    target: Target,
    pattern: Regex,
}

fn rule(kind: ContentKind, target: Target, pattern: &str) -> Rule {
    Rule { kind, target, pattern: Regex::new(pattern).unwrap() }
}

// 顺序即优先级
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use ContentKind::*;
    use Target::*;
    vec![
        rule(Document, Extension, r"(?i)\.(pdf|docx?|xlsx?|pptx?|odt|ods|odp|rtf|txt|csv|epub|md|zip)$"),
        rule(ImageFile, Extension, r"(?i)\.(png|jpe?g|gif|bmp|svg|webp|tiff?|heic)$"),
        rule(
            VideoSite,
            Location,
            r"(?i)(youtube\.com|youtu\.be|vimeo\.com|dailymotion\.com|ted\.com/talks|loom\.com/share|panopto\.com|wistia\.(com|net)|streamable\.com)",
        ),
        rule(VideoFile, Extension, r"(?i)\.(mp4|m4v|mov|avi|wmv|mkv|webm|flv|mpe?g)$"),
        rule(
            AudioSite,
            Location,
            r"(?i)(soundcloud\.com|open\.spotify\.com|podcasts\.apple\.com|anchor\.fm|podbean\.com|buzzsprout\.com)",
        ),
        rule(AudioFile, Extension, r"(?i)\.(mp3|wav|m4a|aac|ogg|oga|flac|wma)$"),
        rule(
            DocumentSite,
            Location,
            r"(?i)(docs\.google\.com|sheets\.google\.com|slides\.google\.com|office\.com|officeapps\.live\.com|sharepoint\.com|prezi\.com)",
        ),
        rule(
            MediaEmbed,
            Location,
            r"(?i)(/media_objects(_iframe)?/|/media_attachments_iframe/|kaltura|media_comment)",
        ),
        rule(
            FileStorageSite,
            Location,
            r"(?i)(\bbox\.com/|dropbox\.com|drive\.google\.com|onedrive\.live\.com|1drv\.ms)",
        ),
        rule(
            DigitalTextbook,
            Location,
            r"(?i)(vitalsource\.com|pearson\.com|mheducation\.com|cengage\.com|wiley\.com|macmillanlearning\.com|redshelf\.com|bookshelf\.)",
        ),
    ]
});

/// 把 URL / 文件名映射到内容类型的节点工厂
pub struct ContentClassifier {
    resource_node: Vec<Regex>,
    force_shortcut: Vec<Regex>,
}

fn compile_all(patterns: &[String]) -> AppResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| AppError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

impl ContentClassifier {
    pub fn new(patterns: &PatternConfig) -> AppResult<Self> {
        Ok(Self {
            resource_node: compile_all(&patterns.resource_node)?,
            force_shortcut: compile_all(&patterns.force_shortcut)?,
        })
    }

    /// 纯函数: 相同输入总是得到相同类型
    pub fn classify(&self, url: Option<&str>, title: Option<&str>) -> ContentKind {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        let path = url.map(|u| {
            Url::parse(u)
                .map(|parsed| {
                    percent_encoding::percent_decode_str(parsed.path())
                        .decode_utf8_lossy()
                        .to_string()
                })
                .unwrap_or_else(|_| u.split(['?', '#']).next().unwrap_or(u).to_string())
        });
        let titled_file = title.map(str::trim).filter(|t| utils::has_file_extension(t));

        RULES
            .iter()
            .find(|r| match r.target {
                Target::Extension => {
                    path.as_deref().is_some_and(|p| r.pattern.is_match(p))
                        || titled_file.is_some_and(|t| r.pattern.is_match(t))
                }
                Target::Location => url.is_some_and(|u| r.pattern.is_match(u)),
            })
            .map(|r| r.kind)
            .unwrap_or(ContentKind::Unsorted)
    }

    /// 指向结构化 API 资源的链接，需要走 data-api 展开
    pub fn is_resource_link(&self, url: &str) -> bool {
        self.resource_node.iter().any(|p| p.is_match(url))
    }

    pub fn force_shortcut(&self, url: &str) -> bool {
        self.force_shortcut.iter().any(|p| p.is_match(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ContentClassifier {
        ContentClassifier::new(&PatternConfig::default()).unwrap()
    }

    #[test]
    fn test_title_extension_classifies_lms_file_link() {
        let c = classifier();
        assert_eq!(
            c.classify(Some("https://host/files/42/download"), Some("report.pdf")),
            ContentKind::Document
        );
        assert_eq!(
            c.classify(Some("https://host/files/42/download"), Some("Week 1 notes")),
            ContentKind::Unsorted
        );
    }

    #[test]
    fn test_precedence() {
        let c = classifier();
        // 文档扩展名先于视频站点
        assert_eq!(
            c.classify(Some("https://www.youtube.com/watch?v=x"), Some("slides.pdf")),
            ContentKind::Document
        );
        assert_eq!(c.classify(Some("https://youtu.be/abc"), None), ContentKind::VideoSite);
        assert_eq!(c.classify(Some("https://cdn.example.com/a/lecture.MP4?sig=1"), None), ContentKind::VideoFile);
        assert_eq!(c.classify(Some("https://soundcloud.com/x/y"), None), ContentKind::AudioSite);
        assert_eq!(c.classify(Some("https://cdn.example.com/ep%201.mp3"), None), ContentKind::AudioFile);
        assert_eq!(c.classify(Some("https://cdn.example.com/diagram.png"), None), ContentKind::ImageFile);
        assert_eq!(
            c.classify(Some("https://docs.google.com/document/d/abc/edit"), None),
            ContentKind::DocumentSite
        );
        assert_eq!(
            c.classify(Some("https://lms.example.edu/media_objects_iframe/m-abc"), None),
            ContentKind::MediaEmbed
        );
        assert_eq!(c.classify(Some("https://app.box.com/s/xyz"), None), ContentKind::FileStorageSite);
        assert_eq!(c.classify(Some("https://www.dropbox.com/s/xyz"), None), ContentKind::FileStorageSite);
        assert_eq!(
            c.classify(Some("https://bookshelf.vitalsource.com/books/1"), None),
            ContentKind::DigitalTextbook
        );
        assert_eq!(c.classify(Some("https://example.com/about"), None), ContentKind::Unsorted);
        assert_eq!(c.classify(None, None), ContentKind::Unsorted);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let first = c.classify(Some("https://drive.google.com/file/d/1"), Some("x"));
        for _ in 0..10 {
            assert_eq!(c.classify(Some("https://drive.google.com/file/d/1"), Some("x")), first);
        }
    }

    #[test]
    fn test_resource_and_shortcut_patterns() {
        let c = classifier();
        assert!(c.is_resource_link("https://lms.example.edu/api/v1/courses/1/pages/intro"));
        assert!(c.is_resource_link("https://lms.example.edu/courses/1/assignments/7"));
        assert!(!c.is_resource_link("https://lms.example.edu/courses/1/files/42/download"));
        assert!(c.is_resource_link("https://lms.example.edu/courses/1/files/42?wrap=1"));
        assert!(c.force_shortcut("https://lms.example.edu/courses/1/external_tools/9"));
        assert!(!c.force_shortcut("https://cdn.example.com/a.pdf"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let patterns = PatternConfig {
            resource_node: vec!["(unclosed".into()],
            force_shortcut: vec![],
        };
        assert!(matches!(
            ContentClassifier::new(&patterns),
            Err(AppError::Pattern { .. })
        ));
    }
}
