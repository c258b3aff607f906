// tests/cli_dispatch_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

// 辅助函数，隔离用户主目录，避免读写真实配置
fn main_command(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("LMS_ACCESS_TOKEN")
        .env_remove("LMS_BASE_URL");
    cmd
}

#[test]
fn test_help_flag() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("显示此帮助信息并退出"))
        .stdout(predicate::str::contains("--include-hidden"));
}

#[test]
fn test_missing_mode_shows_usage() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--download")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_missing_base_url_is_reported() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--id")
        .arg("1234")
        .assert()
        .failure()
        .stderr(predicate::str::contains("未配置 LMS 地址"));
}

#[test]
fn test_unrecognised_input_is_rejected() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--url")
        .arg("not a course")
        .arg("--base-url")
        .arg("http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("既不是课程链接，也不是课程 ID"));
}

#[test]
fn test_unreachable_course_fails() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--id")
        .arg("1234")
        .arg("--base-url")
        .arg("http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("课程 '1234' 不存在或无法访问"));
}

#[test]
fn test_batch_mode_reports_failures() {
    let home = tempdir().unwrap();
    let file_path = home.path().join("courses.txt");
    let mut file = File::create(&file_path).unwrap();
    writeln!(file, "# 注释行会被忽略").unwrap();
    writeln!(file, "1234").unwrap();
    writeln!(file, "not a course").unwrap();

    main_command(home.path())
        .arg("-b")
        .arg(&file_path)
        .arg("--base-url")
        .arg("http://127.0.0.1:9")
        .assert()
        .failure()
        .stdout(predicate::str::contains("失败任务: 2"));
}
