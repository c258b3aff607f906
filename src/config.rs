// src/config.rs

pub mod token;

use self::token::TokenSource;
use crate::{
    cli::{Cli, Subsystem},
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub per_page: Option<u32>,
    pub max_pages: Option<usize>,
}

/// 可配置的 URL 匹配规则 (正则表达式)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// 指向结构化 API 资源的链接，走 data-api 展开而不是内容分类
    pub resource_node: Vec<String>,
    /// 直接生成快捷方式、不尝试下载的链接
    pub force_shortcut: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            resource_node: vec![
                r"/api/v1/courses/\d+/(pages|assignments|discussion_topics|quizzes|modules|files)/[^/?#]+".into(),
                r"/courses/\d+/(pages|assignments|discussion_topics|quizzes|modules|files)/[^/?#]+/?(\?.*)?$".into(),
            ],
            force_shortcut: vec![
                r"(?i)/external_tools/".into(),
                r"(?i)docs\.google\.com/(document|spreadsheets|presentation|forms)/".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub subsystems: Vec<Subsystem>,
    pub warning_limit: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            subsystems: Subsystem::all(),
            warning_limit: constants::DEFAULT_WARNING_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accesstoken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        // 为 NetworkConfig 提供一组稳健的默认值
        let network_config = NetworkConfig {
            connect_timeout_secs: Some(10),
            timeout_secs: Some(60),
            max_retries: Some(3),
            per_page: Some(constants::DEFAULT_PER_PAGE),
            max_pages: Some(constants::DEFAULT_MAX_PAGES),
        };

        Self {
            accesstoken: None,
            base_url: None,
            network: network_config,
            patterns: PatternConfig::default(),
            crawl: CrawlConfig::default(),
        }
    }

    /// `~/.lms-dl/config.json`
    pub fn default_path() -> AppResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?;
        Ok(home.join(constants::CONFIG_DIR_NAME).join(constants::CONFIG_FILE_NAME))
    }

    /// 读取配置文件；文件不存在时写入一份默认配置并返回它
    pub fn load_or_create(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("配置文件 '{}' 格式错误", path.display()))
                .map_err(AppError::from),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Self::default_app_config();
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(path, serde_json::to_string_pretty(&config)?)?;
                info!("已创建默认配置文件 '{}'", path.display());
                Ok(config)
            }
            Err(e) => Err(AppError::Other(
                anyhow::Error::new(e).context(format!("读取配置文件 '{}' 失败", path.display())),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub max_workers: usize,
    pub base_url: Url,
    pub access_token: Option<String>,
    pub token_source: TokenSource,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub per_page: u32,
    pub max_pages: usize,
    pub patterns: PatternConfig,
    pub subsystems: Vec<Subsystem>,
    pub warning_limit: usize,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = ExternalConfig::load_or_create(&ExternalConfig::default_path()?)?;

        let base_url_str = args
            .base_url
            .clone()
            .or_else(|| std::env::var(constants::ENV_BASE_URL).ok().filter(|s| !s.is_empty()))
            .or(external_config.base_url.clone())
            .ok_or(AppError::BaseUrlMissing)?;
        let base_url = Url::parse(&base_url_str)?;

        let (access_token, token_source) = token::resolve_token(
            args.token.as_deref(),
            token::token_from_env(),
            external_config.accesstoken.as_deref(),
        );

        Ok(Self {
            max_workers: args.workers.unwrap_or(constants::DEFAULT_WORKERS).max(1),
            base_url,
            access_token,
            token_source,
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(
                external_config.network.connect_timeout_secs.unwrap_or(10),
            ),
            timeout: Duration::from_secs(external_config.network.timeout_secs.unwrap_or(60)),
            max_retries: external_config.network.max_retries.unwrap_or(3),
            per_page: external_config
                .network
                .per_page
                .unwrap_or(constants::DEFAULT_PER_PAGE),
            max_pages: external_config
                .network
                .max_pages
                .unwrap_or(constants::DEFAULT_MAX_PAGES),
            patterns: external_config.patterns,
            subsystems: args
                .only
                .clone()
                .unwrap_or(external_config.crawl.subsystems),
            warning_limit: external_config.crawl.warning_limit,
        })
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            base_url: Url::parse("https://lms.example.edu").unwrap(),
            access_token: None,
            token_source: TokenSource::Missing,
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
            max_retries: 0,
            per_page: constants::DEFAULT_PER_PAGE,
            max_pages: constants::DEFAULT_MAX_PAGES,
            patterns: PatternConfig::default(),
            subsystems: Subsystem::all(),
            warning_limit: constants::DEFAULT_WARNING_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let created = ExternalConfig::load_or_create(&path).unwrap();
        assert!(path.is_file());
        assert_eq!(created.network.max_retries, Some(3));

        let reloaded = ExternalConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded.patterns.resource_node, created.patterns.resource_node);
        assert!(reloaded.accesstoken.is_none());
    }

    #[test]
    fn test_partial_config_file_uses_section_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"accesstoken": "abc", "base_url": "https://lms.example.edu"}"#).unwrap();
        let config = ExternalConfig::load_or_create(&path).unwrap();
        assert_eq!(config.accesstoken.as_deref(), Some("abc"));
        assert_eq!(config.crawl.subsystems, Subsystem::all());
        assert!(config.network.max_retries.is_none());
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ExternalConfig::load_or_create(&path).is_err());
    }
}
