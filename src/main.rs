// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use lms_dl::{cli::Cli, error::AppError, logging, run_from_cli};
use std::{
    env,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    // 第一次 Ctrl+C 让正在进行的任务尽快收尾，第二次直接退出
    let cancellation_token = Arc::new(AtomicBool::new(false));
    let token = cancellation_token.clone();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if token.swap(true, Ordering::SeqCst) {
                println!("\n{} 用户强制中断程序。", "[!]".yellow());
                std::process::exit(130);
            }
            println!(
                "\n{} 正在停止，再次按 Ctrl+C 立即退出...",
                "[!]".yellow()
            );
        }
    });

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "lms-dl".to_string());
    let after_help = format!(
        "示例:\n  # 爬取课程并导出内容清单\n  {bin} --url \"https://lms.example.edu/courses/1234\" -e content.json\n\n  # 下载课程中的所有内容文件\n  {bin} --id 1234 --download -o ./downloads\n\n  # 批量处理\n  {bin} -b my_courses.txt --download --only modules,files",
        bin = bin_name
    );
    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };

    logging::setup_logger(args.log_level);

    match run_from_cli(args, cancellation_token).await {
        Ok(()) => {}
        Err(AppError::UserInterrupt) => {
            eprintln!("\n{} {}", "[!]".yellow(), "操作已被用户中断。".yellow());
            std::process::exit(130);
        }
        Err(e) => {
            log::error!("程序执行出错: {}", e);
            eprintln!("\n{} {}", "[X]".red(), format!("程序执行出错: {}", e).red());
            std::process::exit(1);
        }
    }
}
