// src/models/mod.rs

pub mod api;

use crate::error::{ApiError, AppError};
use crate::symbols;
use colored::{ColoredString, Colorize};
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DownloadStatus {
    Success,
    Shortcut,
    Skipped,
    HttpError,
    NetworkError,
    ConnectionError,
    TimeoutError,
    IoError,
    UnexpectedError,
}

impl DownloadStatus {
    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            DownloadStatus::Success => (&symbols::OK, |s| s.green(), "下载成功"),
            DownloadStatus::Shortcut => (&symbols::LINK, |s| s.blue(), "已生成快捷方式"),
            DownloadStatus::Skipped => (&symbols::INFO, |s| s.cyan(), "已跳过"),
            DownloadStatus::HttpError => (&symbols::ERROR, |s| s.red(), "服务器返回错误"),
            DownloadStatus::NetworkError => (&symbols::ERROR, |s| s.red(), "网络请求失败"),
            DownloadStatus::ConnectionError => (&symbols::ERROR, |s| s.red(), "无法建立连接"),
            DownloadStatus::TimeoutError => (&symbols::WARN, |s| s.yellow(), "网络连接超时"),
            DownloadStatus::IoError => (&symbols::ERROR, |s| s.red(), "本地文件读写错误"),
            DownloadStatus::UnexpectedError => {
                (&symbols::ERROR, |s| s.red(), "发生未预期的程序错误")
            }
        }
    }

    /// 成功或以快捷方式收尾的资源都会写入下载清单
    pub fn is_settled(&self) -> bool {
        matches!(self, DownloadStatus::Success | DownloadStatus::Shortcut)
    }
}

fn status_from_reqwest(err: &reqwest::Error) -> DownloadStatus {
    if err.is_timeout() {
        DownloadStatus::TimeoutError
    } else if err.is_connect() {
        DownloadStatus::ConnectionError
    } else if err.is_status() {
        DownloadStatus::HttpError
    } else {
        DownloadStatus::NetworkError
    }
}

impl From<&AppError> for DownloadStatus {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Network(err)
            | AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(err))
            | AppError::Api(ApiError::Connection {
                source: reqwest_middleware::Error::Reqwest(err),
                ..
            }) => status_from_reqwest(err),
            AppError::NetworkMiddleware(_) | AppError::Api(ApiError::Connection { .. }) => {
                DownloadStatus::NetworkError
            }
            AppError::Api(ApiError::Status { .. }) => DownloadStatus::HttpError,
            AppError::Api(ApiError::InvalidUrl { .. }) | AppError::Url(_) => {
                DownloadStatus::NetworkError
            }
            AppError::Io(_) | AppError::TempFilePersist(_) | AppError::Security(_) => {
                DownloadStatus::IoError
            }
            _ => DownloadStatus::UnexpectedError,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub filename: String,
    pub status: DownloadStatus,
    pub message: Option<String>,
}

/// 一个待执行的下载任务
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub filepath: PathBuf,
    pub url: String,
    /// 资源的规范地址，用作下载清单的键与快捷方式的目标
    pub source_url: String,
    /// 跳过传输、直接生成快捷方式
    pub force_shortcut: bool,
}

impl FileInfo {
    pub fn display_name(&self) -> String {
        self.filepath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.url.clone())
    }
}
