// src/downloader/job.rs

use super::{
    dispatcher::parse_course_ref, manifest::DownloadManifest, paths, paths::SaveLayout,
    task_runner,
};
use crate::{
    DownloadJobContext,
    error::*,
    export,
    extractor::{
        course::{CourseCrawler, CourseRoot},
        storage_site,
    },
    models::FileInfo,
    symbols,
    tree::derive,
    ui, utils,
    warnings::WarningLog,
};
use colored::*;
use itertools::Itertools;
use log::{debug, info, warn};
use std::fs;

/// 一次下载的计划: 待传输的任务与跳过的条目 (显示名, 原因)
#[derive(Debug, Default)]
pub struct DownloadPlan {
    pub tasks: Vec<FileInfo>,
    pub skipped: Vec<(String, &'static str)>,
}

pub struct ResourceDownloader {
    pub(super) context: DownloadJobContext,
}

impl ResourceDownloader {
    pub fn new(context: DownloadJobContext) -> Self {
        Self { context }
    }

    /// 爬取一门课程，按命令行选项导出清单和下载内容。返回是否全部成功。
    pub async fn run(&self, input: &str) -> AppResult<bool> {
        let course_id = parse_course_ref(input)?;
        info!("开始处理课程 {} (输入: '{}')", course_id, input);

        let root = self.crawl(course_id).await?;
        self.print_summary(&root);

        let args = &self.context.args;
        let layout = SaveLayout::new(args.output.clone(), args.flat);
        if let Some(export_path) = &args.export {
            let export = export::extract_content(&root, args.download.then_some(&layout));
            export.write_to(export_path)?;
            println!(
                "\n{} 已导出 {} 条内容到 \"{}\"",
                *symbols::OK,
                export.content.len(),
                export_path.display()
            );
        }

        if args.download {
            return self.download(&root, &layout).await;
        }
        Ok(true)
    }

    async fn crawl(&self, course_id: u64) -> AppResult<CourseRoot> {
        let warnings = WarningLog::new(self.context.config.warning_limit);
        let adapters = storage_site::default_adapters();
        let crawler = CourseCrawler {
            client: &self.context.http_client,
            classifier: &self.context.classifier,
            adapters: &adapters,
            warnings: &warnings,
            cancellation_token: &self.context.cancellation_token,
            subsystems: &self.context.config.subsystems,
        };
        let spinner = ui::new_spinner(&format!("正在爬取课程 {} ...", course_id));
        let result = crawler.crawl(course_id).await;
        spinner.finish_and_clear();
        if warnings.total() > 0 {
            info!("课程 {} 爬取过程中产生 {} 条警告", course_id, warnings.total());
        }
        warnings.print_report();
        result
    }

    fn print_summary(&self, root: &CourseRoot) {
        let nodes = root.tree.read();
        let counts = root
            .manifest
            .content_view()
            .into_iter()
            .filter_map(|(_, id)| nodes.get(id).and_then(|n| n.as_content()))
            .map(|c| c.kind)
            .counts();
        let total: usize = counts.values().sum();

        ui::print_sub_header(root.title.as_deref().unwrap_or("课程"));
        println!("{} 课程地址: {}", *symbols::INFO, root.course_url);
        println!(
            "{} 共发现 {} 项内容 (重复发现 {} 次)",
            *symbols::INFO,
            total.to_string().green(),
            root.manifest.duplicate_count()
        );
        for (kind, count) in counts.into_iter().sorted_by_key(|(k, _)| format!("{:?}", k)) {
            println!("    - {:<16} {}", format!("{:?}", kind), count);
        }
    }

    /// 规划每项内容的传输任务。清单中已有的、隐藏的、没有地址的和保存路径不安全的内容不会成为任务。
    pub fn plan(
        &self,
        root: &CourseRoot,
        layout: &SaveLayout,
        manifest: &DownloadManifest,
    ) -> DownloadPlan {
        let planned = paths::plan_save_paths(root, layout);
        let include_hidden = self.context.args.include_hidden;
        let mut plan = DownloadPlan::default();

        let nodes = root.tree.read();
        for (_, id) in root.manifest.content_view() {
            let (Some(content), Some(planned_path)) = (nodes[id].as_content(), planned.get(&id))
            else {
                continue;
            };
            let (Some(source_url), Some(fetch_url)) = (
                content.url.as_deref().or(content.download_url.as_deref()),
                content.fetch_url(),
            ) else {
                continue;
            };
            let display = planned_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| source_url.to_string());

            if !include_hidden && derive::is_hidden(&nodes, id) {
                plan.skipped.push((display, "隐藏或未发布的内容"));
                continue;
            }
            if manifest.contains(source_url) {
                plan.skipped.push((display, "下载清单中已存在"));
                continue;
            }
            let relative = planned_path
                .strip_prefix(&layout.base_dir)
                .unwrap_or(planned_path);
            let filepath = match utils::secure_join_path(&layout.base_dir, relative) {
                Ok(path) => path,
                Err(e) => {
                    warn!("跳过保存路径 '{}': {}", planned_path.display(), e);
                    plan.skipped.push((display, "保存路径不安全"));
                    continue;
                }
            };
            plan.tasks.push(FileInfo {
                filepath,
                url: fetch_url.to_string(),
                source_url: source_url.to_string(),
                force_shortcut: content.kind.is_site()
                    || self.context.classifier.force_shortcut(fetch_url),
            });
        }
        plan
    }

    /// 规划保存路径并执行传输，返回是否全部成功
    pub async fn download(&self, root: &CourseRoot, layout: &SaveLayout) -> AppResult<bool> {
        fs::create_dir_all(&layout.base_dir)?;
        let absolute_path = dunce::canonicalize(&layout.base_dir)?;
        info!("文件将保存到目录: \"{}\"", absolute_path.display());
        println!(
            "\n{} 文件将保存到目录: \"{}\"",
            *symbols::INFO,
            absolute_path.display()
        );

        let manifest = DownloadManifest::load_or_create(&layout.base_dir)?;
        let DownloadPlan { tasks, skipped } = self.plan(root, layout, &manifest);
        debug!("待下载 {} 项，跳过 {} 项", tasks.len(), skipped.len());

        let manager = &self.context.manager;
        manager.start_batch(tasks.len() + skipped.len());
        for (name, reason) in &skipped {
            manager.record_skip(name, reason);
        }
        if tasks.is_empty() {
            println!("\n{} 没有需要下载的新内容。", *symbols::INFO);
        } else {
            task_runner::execute_tasks(&self.context, tasks, &manifest).await?;
        }
        manager.print_report();
        Ok(manager.did_all_succeed())
    }
}
