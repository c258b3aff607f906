// src/cli.rs

use crate::constants;
use clap::{Parser, ValueEnum, crate_version};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// 课程中可爬取的子系统
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Modules,
    Pages,
    Assignments,
    Discussions,
    Announcements,
    Quizzes,
    Files,
    #[value(name = "media-objects")]
    MediaObjects,
}

impl Subsystem {
    pub fn all() -> Vec<Subsystem> {
        vec![
            Subsystem::Modules,
            Subsystem::Pages,
            Subsystem::Assignments,
            Subsystem::Discussions,
            Subsystem::Announcements,
            Subsystem::Quizzes,
            Subsystem::Files,
            Subsystem::MediaObjects,
        ]
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["url", "id", "batch_file"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 指定要爬取的课程链接 (例如 https://lms.example.edu/courses/1234)
    #[arg(long, help_heading = "Mode")]
    pub url: Option<String>,
    /// 通过课程ID爬取
    #[arg(long, help_heading = "Mode")]
    pub id: Option<String>,
    /// 从文本文件批量处理多个课程链接或ID (每行一个)
    #[arg(short, long, value_name = "FILE", help_heading = "Mode")]
    pub batch_file: Option<PathBuf>,

    // --- 爬取与下载选项 (Options) ---
    /// 将内容清单导出为 JSON 文件
    #[arg(short, long, value_name = "FILE", help_heading = "Options")]
    pub export: Option<PathBuf>,
    /// 爬取完成后下载所有内容文件
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub download: bool,
    /// 同时下载被隐藏、未发布或锁定的内容
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub include_hidden: bool,
    /// 仅爬取指定的子系统 (逗号分隔)
    #[arg(long, value_enum, value_delimiter = ',', help_heading = "Options")]
    pub only: Option<Vec<Subsystem>>,
    /// 提供访问令牌 (Access Token)，优先级最高
    #[arg(long, help_heading = "Options")]
    pub token: Option<String>,
    /// LMS 站点地址，覆盖配置文件中的 base_url
    #[arg(long, value_name = "URL", help_heading = "Options")]
    pub base_url: Option<String>,
    /// 将所有文件下载到同一个目录，不按课程结构创建子目录
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub flat: bool,
    /// 设置最大并发数 (API 请求与下载)
    #[arg(short, long, value_parser = clap::value_parser!(usize), help_heading = "Options")]
    pub workers: Option<usize>,
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR", default_value_os_t = PathBuf::from(constants::DEFAULT_SAVE_DIR), help_heading = "Options")]
    pub output: PathBuf,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
