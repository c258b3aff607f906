// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const FILENAME_TRUNCATE_LENGTH: usize = 65;
pub const MAX_FILENAME_BYTES: usize = 200;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const DOWNLOAD_MANIFEST_FILE_NAME: &str = ".lms-dl-manifest.json";
pub const DOWNLOAD_MANIFEST_VERSION: u32 = 1;
pub const SHORTCUT_EXTENSION: &str = "url";
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_PER_PAGE: u32 = 100;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_WARNING_LIMIT: usize = 50;
/// Box 页面内嵌 JSON 被截断时，最多补齐的右花括号数量
pub const MAX_BRACE_REPAIR: usize = 8;
pub const USER_AGENT: &str = concat!(clap::crate_name!(), "/", clap::crate_version!());

pub const ENV_ACCESS_TOKEN: &str = "LMS_ACCESS_TOKEN";
pub const ENV_BASE_URL: &str = "LMS_BASE_URL";

pub mod api {
    pub mod item_types {
        pub const PAGE: &str = "Page";
        pub const ASSIGNMENT: &str = "Assignment";
        pub const DISCUSSION: &str = "Discussion";
        pub const QUIZ: &str = "Quiz";
        pub const FILE: &str = "File";
        pub const EXTERNAL_URL: &str = "ExternalUrl";
        pub const EXTERNAL_TOOL: &str = "ExternalTool";
        pub const SUB_HEADER: &str = "SubHeader";
    }
    pub mod media_types {
        pub const AUDIO: &str = "audio";
    }
}
