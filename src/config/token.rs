// src/config/token.rs

use crate::constants;
use log::debug;
use std::fmt;

/// Access Token 的来源，用于启动时提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    CommandLine,
    Environment,
    ConfigFile,
    Missing,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::CommandLine => write!(f, "命令行参数"),
            TokenSource::Environment => write!(f, "环境变量 ({})", constants::ENV_ACCESS_TOKEN),
            TokenSource::ConfigFile => write!(f, "本地配置文件"),
            TokenSource::Missing => write!(f, "未找到"),
        }
    }
}

pub fn token_from_env() -> Option<String> {
    std::env::var(constants::ENV_ACCESS_TOKEN).ok()
}

/// 按 命令行参数 → 环境变量 → 配置文件 的顺序选出第一个非空 Token
pub fn resolve_token(
    cli_token: Option<&str>,
    env_token: Option<String>,
    file_token: Option<&str>,
) -> (Option<String>, TokenSource) {
    let candidates = [
        (cli_token.map(str::to_string), TokenSource::CommandLine),
        (env_token, TokenSource::Environment),
        (file_token.map(str::to_string), TokenSource::ConfigFile),
    ];
    for (token, source) in candidates {
        if let Some(token) = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            debug!("使用来自{}的 Token", source);
            return (Some(token), source);
        }
    }
    debug!("未在任何位置找到可用的 Token");
    (None, TokenSource::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_wins_over_env_and_file() {
        let (token, source) = resolve_token(Some("cli"), Some("env".into()), Some("file"));
        assert_eq!(token.as_deref(), Some("cli"));
        assert_eq!(source, TokenSource::CommandLine);
    }

    #[test]
    fn test_empty_values_fall_through() {
        let (token, source) = resolve_token(Some(""), Some("  ".into()), Some("file"));
        assert_eq!(token.as_deref(), Some("file"));
        assert_eq!(source, TokenSource::ConfigFile);

        let (token, source) = resolve_token(None, Some("env".into()), None);
        assert_eq!(token.as_deref(), Some("env"));
        assert_eq!(source, TokenSource::Environment);
    }

    #[test]
    fn test_missing_everywhere() {
        assert_eq!(resolve_token(None, None, Some("")), (None, TokenSource::Missing));
    }
}
