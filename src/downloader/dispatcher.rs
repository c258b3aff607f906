// src/downloader/dispatcher.rs

use crate::error::*;
use log::{debug, error};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static COURSE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/courses/(\d+)(?:/|$)").unwrap());

/// 将用户输入 (课程 ID 或课程链接) 解析为课程 ID。
pub fn parse_course_ref(input: &str) -> AppResult<u64> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return input
            .parse()
            .map_err(|_| AppError::UserInputError(format!("课程 ID '{}' 超出范围", input)));
    }

    let url = Url::parse(input).map_err(|_| {
        error!("无法解析输入 '{}'", input);
        AppError::UserInputError(format!("输入 '{}' 既不是课程链接，也不是课程 ID。", input))
    })?;
    let id = COURSE_PATH_RE
        .captures(url.path())
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| {
            AppError::UserInputError(format!("链接 '{}' 中没有找到课程 ID。", input))
        })?;
    debug!("从链接 '{}' 中解析出课程 ID {}", input, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_course_ref() {
        assert_eq!(parse_course_ref("1234").unwrap(), 1234);
        assert_eq!(parse_course_ref(" 42 ").unwrap(), 42);
        assert_eq!(
            parse_course_ref("https://lms.example.edu/courses/987/modules").unwrap(),
            987
        );
        assert_eq!(
            parse_course_ref("https://lms.example.edu/courses/55").unwrap(),
            55
        );
    }

    #[test]
    fn test_parse_course_ref_rejects_garbage() {
        assert!(matches!(parse_course_ref("abc"), Err(AppError::UserInputError(_))));
        assert!(matches!(
            parse_course_ref("https://lms.example.edu/courses/abc"),
            Err(AppError::UserInputError(_))
        ));
        assert!(matches!(
            parse_course_ref("https://lms.example.edu/users/5"),
            Err(AppError::UserInputError(_))
        ));
    }
}
