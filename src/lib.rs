// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod export;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod symbols;
pub mod tree;
pub mod ui;
pub mod utils;
pub mod warnings;

use crate::{
    cli::Cli,
    client::RobustClient,
    config::AppConfig,
    downloader::{DownloadManager, ResourceDownloader},
    error::{AppError, AppResult},
    extractor::classifier::ContentClassifier,
};
use anyhow::anyhow;
use colored::*;
use log::{debug, info};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// 核心的执行上下文，包含所有任务所需的状态和工具
#[derive(Clone)]
pub struct DownloadJobContext {
    pub manager: DownloadManager,
    pub config: Arc<AppConfig>,
    pub http_client: Arc<RobustClient>,
    pub classifier: Arc<ContentClassifier>,
    pub args: Arc<Cli>,
    pub cancellation_token: Arc<AtomicBool>,
}

impl DownloadJobContext {
    pub fn new(
        config: Arc<AppConfig>,
        args: Arc<Cli>,
        cancellation_token: Arc<AtomicBool>,
    ) -> AppResult<Self> {
        Ok(Self {
            manager: DownloadManager::new(),
            http_client: Arc::new(RobustClient::new(config.clone())?),
            classifier: Arc::new(ContentClassifier::new(&config.patterns)?),
            config,
            args,
            cancellation_token,
        })
    }
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>, cancellation_token: Arc<AtomicBool>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);
    if !args.download && args.export.is_none() {
        println!(
            "{} 未指定 --download 或 --export，本次只爬取并显示内容统计。",
            *symbols::INFO
        );
    }

    let config = Arc::new(AppConfig::new(&args)?);
    debug!("加载的应用配置: {:?}", config);

    if config.access_token.is_some() {
        info!("从 {} 加载 Access Token", config.token_source);
        println!(
            "\n{} 已从 {} 加载 Access Token。",
            *symbols::INFO,
            config.token_source
        );
    } else {
        info!("未找到 Access Token");
        println!(
            "\n{}",
            format!("{} 未找到 Access Token，只能访问公开课程。", *symbols::INFO).yellow()
        );
    }

    let context = DownloadJobContext::new(config, args.clone(), cancellation_token)?;

    if let Some(batch_file) = &args.batch_file {
        process_batch_tasks(batch_file, context).await
    } else if let Some(input) = args.url.as_deref().or(args.id.as_deref()) {
        process_single_task(input, context).await
    } else {
        Err(AppError::UserInputError(
            "必须提供 --url、--id 或 --batch-file 之一。".to_string(),
        ))
    }
}

async fn process_batch_tasks(batch_file: &Path, base_context: DownloadJobContext) -> AppResult<()> {
    let content = std::fs::read_to_string(batch_file).map_err(|e| {
        log::error!("读取批量文件 '{}' 失败: {}", batch_file.display(), e);
        AppError::from(e)
    })?;

    let tasks: Vec<String> = content
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect();
    if tasks.is_empty() {
        log::warn!("批量文件 '{}' 为空或不含有效行。", batch_file.display());
        ui::warn(&format!("批量文件 '{}' 为空。", batch_file.display()));
        return Ok(());
    }

    let mut success = 0;
    let mut failed = 0;
    ui::print_header(&format!(
        "开始批量处理任务 (按 {} 可随时退出)",
        *symbols::CTRL_C
    ));
    for (i, task) in tasks.iter().enumerate() {
        if base_context.cancellation_token.load(Ordering::Relaxed) {
            return Err(AppError::UserInterrupt);
        }
        ui::print_sub_header(&format!(
            "批量任务 {}/{} - {}",
            i + 1,
            tasks.len(),
            utils::truncate_text(task, 60)
        ));
        match process_single_task(task, base_context.clone()).await {
            Ok(_) => success += 1,
            Err(AppError::UserInterrupt) => return Err(AppError::UserInterrupt),
            Err(e) => {
                failed += 1;
                log::error!("批量任务 '{}' 失败: {}", task, e);
                ui::error(&format!("处理任务时发生错误: {}", e));
            }
        }
    }

    ui::print_header("批量任务报告");
    println!(
        "{} | {} | 总计: {}",
        format!("成功任务: {}", success).green(),
        format!("失败任务: {}", failed).red(),
        tasks.len()
    );
    if failed > 0 {
        Err(AppError::Other(anyhow!("{} 个批量任务执行失败。", failed)))
    } else {
        Ok(())
    }
}

async fn process_single_task(input: &str, context: DownloadJobContext) -> AppResult<()> {
    let all_ok = ResourceDownloader::new(context).run(input).await?;
    if all_ok {
        Ok(())
    } else {
        Err(AppError::Other(anyhow!("部分文件下载失败，重新运行可重试失败的文件。")))
    }
}
