// src/downloader/task_runner.rs

use super::{manifest::DownloadManifest, task_processor::TaskProcessor};
use crate::{DownloadJobContext, constants, error::*, models::*, ui, utils};
use futures::{StreamExt, stream};
use indicatif::ProgressBar;
use log::error;
use std::{cmp::min, sync::atomic::Ordering};

/// 负责执行一批下载任务，管理并发、进度报告和下载清单的写入。
pub async fn execute_tasks(
    context: &DownloadJobContext,
    tasks: Vec<FileInfo>,
    manifest: &DownloadManifest,
) -> AppResult<()> {
    let max_workers = min(context.config.max_workers, tasks.len());
    if max_workers == 0 {
        return Ok(());
    }

    ui::plain("");
    ui::info(&format!(
        "开始下载 {} 个文件 (并发数: {})...",
        tasks.len(),
        max_workers
    ));
    let main_pbar = ui::new_tasks_progress_bar(tasks.len() as u64, "下载");

    stream::iter(tasks)
        .for_each_concurrent(max_workers, |task| {
            run_single_concurrent_task(task, context, manifest, main_pbar.clone())
        })
        .await;

    main_pbar.finish_and_clear();
    if context.cancellation_token.load(Ordering::Relaxed) {
        return Err(AppError::UserInterrupt);
    }
    Ok(())
}

/// 在并发池中运行的单个任务单元。
async fn run_single_concurrent_task(
    task: FileInfo,
    context: &DownloadJobContext,
    manifest: &DownloadManifest,
    main_pbar: ProgressBar,
) {
    if context.cancellation_token.load(Ordering::Relaxed) {
        return;
    }

    let processor = TaskProcessor::new(context.clone());
    let result = match processor.process(task.clone()).await {
        Ok(result) => result,
        Err(e) => {
            error!("任务 '{}' 中止: {}", task.display_name(), e);
            return;
        }
    };

    match result.status {
        DownloadStatus::Success => context.manager.record_success(),
        DownloadStatus::Shortcut => context.manager.record_shortcut(
            &result.filename,
            result.message.as_deref().unwrap_or("无法下载"),
        ),
        DownloadStatus::Skipped => context.manager.record_skip(
            &result.filename,
            result.message.as_deref().unwrap_or("已跳过"),
        ),
        status => context.manager.record_failure(&result.filename, status),
    }

    // 只有成功或生成快捷方式的资源才写入清单，失败的资源下次运行会重试
    if result.status.is_settled()
        && let Err(e) = manifest.append(&task.source_url)
    {
        error!("无法写入下载清单 '{}': {}", manifest.path().display(), e);
    }

    main_pbar.inc(1);
    let (symbol, color_fn, default_msg) = result.status.get_display_info();
    let name = utils::truncate_text(&result.filename, constants::FILENAME_TRUNCATE_LENGTH);
    let msg = match (&result.status, &result.message) {
        (DownloadStatus::Success, _) | (_, None) => format!("{} {}", symbol, name),
        (DownloadStatus::Shortcut, Some(reason)) => format!(
            "{} {} {}",
            symbol,
            name,
            color_fn(format!("({})", reason).into())
        ),
        (_, Some(err_msg)) => format!(
            "{} {} {}",
            symbol,
            name,
            color_fn(format!("失败: {} (详情: {})", default_msg, err_msg).into())
        ),
    };
    main_pbar.println(msg);
}
