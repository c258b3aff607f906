// src/models/api.rs

use serde::Deserialize;
use serde_json::{Map, Value};

/// 未建模的字段统一收进 `extra`，只用于透传和导出，不参与分派。
pub type Extra = Map<String, Value>;

// --- 课程 (Course) ---

#[derive(Deserialize, Debug, Clone)]
pub struct CourseRecord {
    pub id: u64,
    pub name: Option<String>,
    pub course_code: Option<String>,
    pub syllabus_body: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Canvas 风格的错误信封: `{"errors":[{"message":"..."}]}` 或 `{"message":"..."}`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn message(&self) -> Option<String> {
        if let Some(msg) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return Some(msg.to_string());
        }
        match self.errors.as_ref()? {
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("message").and_then(Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(Value::Object(map.clone()).to_string())),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

// --- 单元 (Module) ---

#[derive(Deserialize, Debug, Clone)]
pub struct ModuleRecord {
    pub id: u64,
    pub name: Option<String>,
    pub position: Option<i64>,
    pub published: Option<bool>,
    pub items_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ModuleItemRecord {
    pub id: u64,
    pub title: Option<String>,
    pub position: Option<i64>,
    #[serde(rename = "type")]
    pub item_type: String,
    pub html_url: Option<String>,
    pub url: Option<String>,
    pub external_url: Option<String>,
    pub published: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

// --- 页面 (Page) ---

#[derive(Deserialize, Debug, Clone)]
pub struct PageRecord {
    pub page_id: Option<u64>,
    /// 页面的 slug，例如 "week-1-overview"
    pub url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
    pub hide_from_students: Option<bool>,
    pub locked_for_user: Option<bool>,
    pub html_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// --- 作业 (Assignment) ---

#[derive(Deserialize, Debug, Clone)]
pub struct AssignmentRecord {
    pub id: u64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub position: Option<i64>,
    pub published: Option<bool>,
    pub locked_for_user: Option<bool>,
    pub html_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// --- 讨论 / 公告 (Discussion / Announcement) ---

#[derive(Deserialize, Debug, Clone)]
pub struct DiscussionRecord {
    pub id: u64,
    pub title: Option<String>,
    pub message: Option<String>,
    pub position: Option<i64>,
    pub published: Option<bool>,
    pub locked: Option<bool>,
    pub locked_for_user: Option<bool>,
    pub html_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// --- 测验 (Quiz) ---

#[derive(Deserialize, Debug, Clone)]
pub struct QuizRecord {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published: Option<bool>,
    pub locked_for_user: Option<bool>,
    pub html_url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// --- 文件与文件夹 (File / Folder) ---

#[derive(Deserialize, Debug, Clone)]
pub struct FolderRecord {
    pub id: u64,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub parent_folder_id: Option<u64>,
    pub position: Option<i64>,
    pub hidden: Option<bool>,
    pub locked: Option<bool>,
    pub hidden_for_user: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileRecord {
    pub id: u64,
    pub display_name: Option<String>,
    pub filename: Option<String>,
    /// 带校验参数的下载地址
    pub url: Option<String>,
    #[serde(rename = "content-type")]
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub folder_id: Option<u64>,
    pub hidden: Option<bool>,
    pub locked: Option<bool>,
    pub hidden_for_user: Option<bool>,
    pub locked_for_user: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

// --- 媒体对象 (Media Object) ---

#[derive(Deserialize, Debug, Clone)]
pub struct MediaSource {
    pub url: Option<String>,
    pub content_type: Option<String>,
    pub bitrate: Option<String>,
    pub size: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaObjectRecord {
    pub media_id: String,
    pub title: Option<String>,
    pub user_entered_title: Option<String>,
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,
    #[serde(default)]
    pub media_tracks: Vec<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl MediaObjectRecord {
    pub fn display_title(&self) -> Option<&str> {
        self.user_entered_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.title.as_deref())
    }

    /// 码率最高的可用源
    pub fn best_source(&self) -> Option<&MediaSource> {
        self.media_sources
            .iter()
            .filter(|s| s.url.is_some())
            .max_by_key(|s| {
                s.bitrate
                    .as_deref()
                    .and_then(|b| b.parse::<u64>().ok())
                    .unwrap_or(0)
            })
    }
}
