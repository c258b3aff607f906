// src/downloader/shortcut.rs

use crate::{constants, error::AppResult};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// 快捷方式与原文件同目录，文件名追加 `.url`
pub fn shortcut_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "link".into());
    name.push(".");
    name.push(constants::SHORTCUT_EXTENSION);
    path.with_file_name(name)
}

/// 在无法下载文件时写入指向原地址的 Internet Shortcut
pub fn write_shortcut(path: &Path, url: &str) -> AppResult<PathBuf> {
    let shortcut = shortcut_path_for(path);
    if let Some(parent) = shortcut.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&shortcut, format!("[InternetShortcut]\r\nURL={}\r\n", url))?;
    Ok(shortcut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_shortcut() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Week 1").join("report.pdf");
        let written = write_shortcut(&target, "https://lms/files/42").unwrap();
        assert_eq!(written, dir.path().join("Week 1").join("report.pdf.url"));
        let content = fs::read_to_string(written).unwrap();
        assert!(content.starts_with("[InternetShortcut]"));
        assert!(content.contains("URL=https://lms/files/42"));
        assert!(!target.exists());
    }
}
