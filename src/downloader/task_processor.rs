// src/downloader/task_processor.rs

use super::shortcut;
use crate::{DownloadJobContext, error::*, models::*};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::{
    fs,
    io::{ErrorKind, Write as IoWrite},
    path::Path,
    sync::atomic::Ordering,
};
use tempfile::NamedTempFile;

/// 下载失败时是否改为生成快捷方式；返回值为记录在报告中的原因。
/// 需要授权的资源、无法连接的主机、非 http 地址和无写入权限都属于此类。
pub(super) fn shortcut_reason(error: &AppError) -> Option<String> {
    match error {
        AppError::Api(ApiError::Status { status, message, .. }) if (401..=406).contains(status) => {
            Some(format!("HTTP {} {}", status, message))
        }
        AppError::Api(ApiError::InvalidUrl { reason, .. }) => Some(format!("无效地址: {}", reason)),
        AppError::Api(ApiError::Connection { source, .. }) => match source {
            reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => None,
            _ => Some("无法建立连接".to_string()),
        },
        AppError::Network(e) if e.is_connect() => Some("无法建立连接".to_string()),
        AppError::Io(e) if e.kind() == ErrorKind::PermissionDenied => {
            Some("没有写入权限".to_string())
        }
        AppError::TempFilePersist(e) if e.error.kind() == ErrorKind::PermissionDenied => {
            Some("没有写入权限".to_string())
        }
        _ => None,
    }
}

/// `TaskProcessor` 封装了处理单个下载任务的所有逻辑。
pub struct TaskProcessor {
    context: DownloadJobContext,
}

impl TaskProcessor {
    pub fn new(context: DownloadJobContext) -> Self {
        Self { context }
    }

    /// 处理单个文件任务: 传输或生成快捷方式。只有用户中断会作为错误返回。
    pub async fn process(&self, item: FileInfo) -> AppResult<DownloadResult> {
        let filename = item.display_name();
        if item.force_shortcut {
            debug!("'{}' 匹配快捷方式规则，跳过传输", item.url);
            return Ok(self.settle_as_shortcut(&item, "站点或外部工具链接".to_string()));
        }

        match self.download_file(&item).await {
            Ok(()) => Ok(DownloadResult {
                filename,
                status: DownloadStatus::Success,
                message: None,
            }),
            Err(AppError::UserInterrupt) => Err(AppError::UserInterrupt),
            Err(e) => match shortcut_reason(&e) {
                Some(reason) => {
                    info!("'{}' 无法下载 ({})，改为生成快捷方式", item.url, e);
                    Ok(self.settle_as_shortcut(&item, reason))
                }
                None => {
                    error!("处理任务 '{:?}' 时发生错误: {}", item.filepath, e);
                    Ok(DownloadResult {
                        filename,
                        status: DownloadStatus::from(&e),
                        message: Some(e.to_string()),
                    })
                }
            },
        }
    }

    fn settle_as_shortcut(&self, item: &FileInfo, reason: String) -> DownloadResult {
        match shortcut::write_shortcut(&item.filepath, &item.source_url) {
            Ok(path) => DownloadResult {
                filename: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| item.display_name()),
                status: DownloadStatus::Shortcut,
                message: Some(reason),
            },
            Err(e) => {
                error!("无法为 '{}' 写入快捷方式: {}", item.source_url, e);
                DownloadResult {
                    filename: item.display_name(),
                    status: DownloadStatus::from(&e),
                    message: Some(e.to_string()),
                }
            }
        }
    }

    /// 流式写入同目录下的临时文件，每个分块后刷新并同步，完成后原子替换到目标路径。
    async fn download_file(&self, item: &FileInfo) -> AppResult<()> {
        let dir = item.filepath.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let res = self.context.http_client.get(&item.url).await?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if self.context.cancellation_token.load(Ordering::Relaxed) {
                warn!("下载 '{}' 时被用户中断", item.url);
                return Err(AppError::UserInterrupt);
            }
            let chunk = chunk?;
            let file = tmp.as_file_mut();
            file.write_all(&chunk)?;
            file.flush()?;
            file.sync_data()?;
        }
        tmp.persist(&item.filepath)?;
        debug!("已保存 '{}'", item.filepath.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn status_error(status: u16) -> AppError {
        AppError::Api(ApiError::Status {
            url: "https://lms/files/1".into(),
            status,
            message: "denied".into(),
        })
    }

    #[test]
    fn test_shortcut_reason_for_auth_statuses() {
        for status in [401, 403, 404, 406] {
            assert!(shortcut_reason(&status_error(status)).is_some(), "{}", status);
        }
        assert!(shortcut_reason(&status_error(400)).is_none());
        assert!(shortcut_reason(&status_error(500)).is_none());
    }

    #[test]
    fn test_shortcut_reason_for_invalid_url_and_permissions() {
        let invalid = AppError::Api(ApiError::InvalidUrl {
            url: "ftp://x".into(),
            reason: "不支持的协议 'ftp'".into(),
        });
        assert!(shortcut_reason(&invalid).is_some());

        let denied = AppError::Io(io::Error::new(ErrorKind::PermissionDenied, "denied"));
        assert!(shortcut_reason(&denied).is_some());

        let disk_full = AppError::Io(io::Error::other("disk full"));
        assert!(shortcut_reason(&disk_full).is_none());
        assert!(shortcut_reason(&AppError::UserInterrupt).is_none());
    }

    #[test]
    fn test_shortcut_reason_for_denied_rename_of_temp_file() {
        let persist_error = |kind: ErrorKind| {
            AppError::TempFilePersist(tempfile::PersistError {
                error: io::Error::new(kind, "rename failed"),
                file: NamedTempFile::new().unwrap(),
            })
        };
        assert_eq!(
            shortcut_reason(&persist_error(ErrorKind::PermissionDenied)).as_deref(),
            Some("没有写入权限")
        );
        assert!(shortcut_reason(&persist_error(ErrorKind::NotFound)).is_none());
    }
}
