// src/error.rs

use thiserror::Error;

/// API 网关的失败分类。核心逻辑把所有这类失败都视为 "无数据"。
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("无法连接到 '{url}': {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest_middleware::Error,
    },
    #[error("无效的 URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("无法解析来自 '{url}' 的响应: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("HTTP {status} ({url}): {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("任务已取消")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("课程 '{0}' 不存在或无法访问")]
    CourseNotFound(String),
    #[error("未配置 LMS 地址 (请使用 --base-url 或在配置文件中设置 base_url)")]
    BaseUrlMissing,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("无效的匹配规则 '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("安全错误: {0}")]
    Security(String),
    #[error("用户中断")]
    UserInterrupt,
    #[error("{0}")] // 只打印内部信息，不加任何前缀
    UserInputError(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
