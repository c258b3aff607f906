// src/downloader/mod.rs

mod dispatcher;
mod job;
pub mod manifest;
pub mod paths;
pub mod shortcut;
mod task_processor;
mod task_runner;

pub use dispatcher::parse_course_ref;
pub use job::{DownloadPlan, ResourceDownloader};
pub use manifest::DownloadManifest;
pub use paths::SaveLayout;

use crate::{models::DownloadStatus, symbols, ui};
use colored::*;
use log::info;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub success: usize,
    pub shortcut: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct DownloadManager {
    stats: Arc<Mutex<DownloadStats>>,
    failed_downloads: Arc<Mutex<Vec<(String, String)>>>,
    skipped_downloads: Arc<Mutex<Vec<(String, String)>>>,
    shortcut_downloads: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadManager {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Mutex::new(DownloadStats::default())),
            failed_downloads: Arc::new(Mutex::new(Vec::new())),
            skipped_downloads: Arc::new(Mutex::new(Vec::new())),
            shortcut_downloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn start_batch(&self, total_tasks: usize) {
        info!("开始新一批下载任务，总数: {}", total_tasks);
        let mut stats = self.stats.lock().unwrap();
        *stats = DownloadStats {
            total: total_tasks,
            ..Default::default()
        };
        self.failed_downloads.lock().unwrap().clear();
        self.skipped_downloads.lock().unwrap().clear();
        self.shortcut_downloads.lock().unwrap().clear();
    }

    pub fn record_success(&self) {
        self.stats.lock().unwrap().success += 1;
    }

    pub fn record_shortcut(&self, filename: &str, reason: &str) {
        info!("文件 '{}' 以快捷方式保存，原因: {}", filename, reason);
        self.stats.lock().unwrap().shortcut += 1;
        self.shortcut_downloads
            .lock()
            .unwrap()
            .push((filename.to_string(), reason.to_string()));
    }

    pub fn record_skip(&self, filename: &str, reason: &str) {
        info!("跳过文件 '{}'，原因: {}", filename, reason);
        self.stats.lock().unwrap().skipped += 1;
        self.skipped_downloads
            .lock()
            .unwrap()
            .push((filename.to_string(), reason.to_string()));
    }

    pub fn record_failure(&self, filename: &str, status: DownloadStatus) {
        log::error!("文件 '{}' 下载失败，状态: {:?}", filename, status);
        self.stats.lock().unwrap().failed += 1;
        let (_, _, msg) = status.get_display_info();
        self.failed_downloads
            .lock()
            .unwrap()
            .push((filename.to_string(), msg.to_string()));
    }

    pub fn get_stats(&self) -> DownloadStats {
        self.stats.lock().unwrap().clone()
    }

    pub fn did_all_succeed(&self) -> bool {
        self.stats.lock().unwrap().failed == 0
    }

    pub fn print_report(&self) {
        let stats = self.get_stats();
        let skipped = self.skipped_downloads.lock().unwrap();
        let failed = self.failed_downloads.lock().unwrap();
        let shortcuts = self.shortcut_downloads.lock().unwrap();
        info!(
            "下载报告: Total={}, Success={}, Shortcut={}, Skipped={}, Failed={}",
            stats.total, stats.success, stats.shortcut, stats.skipped, stats.failed
        );

        if !skipped.is_empty() || !failed.is_empty() || !shortcuts.is_empty() {
            ui::print_sub_header("下载详情报告");
            if !skipped.is_empty() {
                println!("\n{} 跳过的文件 ({}个):", *symbols::INFO, stats.skipped);
                print_grouped_report(&skipped, |s| s.cyan());
            }
            if !shortcuts.is_empty() {
                println!("\n{} 以快捷方式保存的文件 ({}个):", *symbols::LINK, stats.shortcut);
                print_grouped_report(&shortcuts, |s| s.blue());
            }
            if !failed.is_empty() {
                println!("\n{} 失败的文件 ({}个):", *symbols::ERROR, stats.failed);
                print_grouped_report(&failed, |s| s.red());
            }
        }
        ui::print_sub_header("任务总结");
        if stats.total > 0 && stats.failed == 0 {
            println!(
                "{} 所有 {} 个任务均已完成 ({} 个快捷方式, {} 个已跳过)。",
                *symbols::OK,
                stats.total,
                stats.shortcut,
                stats.skipped
            );
        } else {
            let summary = format!(
                "{} | {} | {} | {}",
                format!("成功: {}", stats.success).green(),
                format!("快捷方式: {}", stats.shortcut).blue(),
                format!("失败: {}", stats.failed).red(),
                format!("跳过: {}", stats.skipped).yellow()
            );
            println!("{}", summary);
        }
    }
}

fn print_grouped_report(items: &[(String, String)], color_fn: fn(ColoredString) -> ColoredString) {
    let mut grouped: HashMap<&String, Vec<&String>> = HashMap::new();
    for (filename, reason) in items {
        grouped.entry(reason).or_default().push(filename);
    }
    let mut sorted_reasons: Vec<_> = grouped.keys().collect();
    sorted_reasons.sort();
    for reason in sorted_reasons {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        let mut filenames = grouped.get(reason).cloned().unwrap_or_default();
        filenames.sort();
        for filename in filenames {
            println!("    - {}", filename);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_counts() {
        let manager = DownloadManager::new();
        manager.start_batch(4);
        manager.record_success();
        manager.record_shortcut("a.pdf", "HTTP 404");
        manager.record_skip("b.pdf", "已下载");
        manager.record_failure("c.pdf", DownloadStatus::TimeoutError);
        assert_eq!(
            manager.get_stats(),
            DownloadStats {
                total: 4,
                success: 1,
                shortcut: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert!(!manager.did_all_succeed());
    }
}
