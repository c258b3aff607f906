// src/downloader/manifest.rs

use crate::{constants, error::*};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    #[serde(default)]
    downloaded: Vec<String>,
}

impl ManifestFile {
    fn template() -> Self {
        Self {
            version: constants::DOWNLOAD_MANIFEST_VERSION,
            downloaded: Vec::new(),
        }
    }
}

struct ManifestState {
    file: ManifestFile,
    seen: HashSet<String>,
}

/// 保存目录下已下载 URL 的记录，使重复运行不再重新传输。
/// 追加操作串行化，每次追加后立即写回磁盘。
pub struct DownloadManifest {
    path: PathBuf,
    state: Mutex<ManifestState>,
}

impl DownloadManifest {
    pub fn load_or_create(dir: &Path) -> AppResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(constants::DOWNLOAD_MANIFEST_FILE_NAME);
        let file = if path.is_file() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<ManifestFile>(&content) {
                Ok(file) => {
                    debug!("读取下载清单 '{}'，已有 {} 条记录", path.display(), file.downloaded.len());
                    file
                }
                Err(e) => {
                    warn!("下载清单 '{}' 损坏 ({})，将重新创建", path.display(), e);
                    ManifestFile::template()
                }
            }
        } else {
            info!("创建下载清单 '{}'", path.display());
            ManifestFile::template()
        };
        let seen = file.downloaded.iter().cloned().collect();
        let manifest = Self {
            path,
            state: Mutex::new(ManifestState { file, seen }),
        };
        manifest.persist(&manifest.state.lock().unwrap().file)?;
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, url: &str) -> bool {
        self.state.lock().unwrap().seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().file.downloaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 追加一条记录并写回；已存在的 URL 不会重复写入
    pub fn append(&self, url: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.seen.insert(url.to_string()) {
            return Ok(());
        }
        state.file.downloaded.push(url.to_string());
        self.persist(&state.file)
    }

    fn persist(&self, file: &ManifestFile) -> AppResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(file)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}
