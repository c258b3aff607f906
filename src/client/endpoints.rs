// src/client/endpoints.rs

use super::RobustClient;
use crate::{error::ApiError, models::api::*};

impl RobustClient {
    pub async fn course(&self, course_id: u64) -> Result<CourseRecord, ApiError> {
        let url = self.api_url(&format!("courses/{}?include[]=syllabus_body", course_id));
        self.get_json(&url).await
    }

    pub async fn announcements(&self, course_id: u64) -> Result<Vec<DiscussionRecord>, ApiError> {
        let url = self.api_url(&format!(
            "courses/{}/discussion_topics?only_announcements=true",
            course_id
        ));
        self.get_paginated(&url).await
    }

    pub async fn assignments(&self, course_id: u64) -> Result<Vec<AssignmentRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/assignments", course_id));
        self.get_paginated(&url).await
    }

    pub async fn assignment(&self, course_id: u64, id: u64) -> Result<AssignmentRecord, ApiError> {
        let url = self.api_url(&format!("courses/{}/assignments/{}", course_id, id));
        self.get_json(&url).await
    }

    pub async fn discussions(&self, course_id: u64) -> Result<Vec<DiscussionRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/discussion_topics", course_id));
        self.get_paginated(&url).await
    }

    pub async fn discussion(&self, course_id: u64, id: u64) -> Result<DiscussionRecord, ApiError> {
        let url = self.api_url(&format!("courses/{}/discussion_topics/{}", course_id, id));
        self.get_json(&url).await
    }

    pub async fn modules(&self, course_id: u64) -> Result<Vec<ModuleRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/modules", course_id));
        self.get_paginated(&url).await
    }

    /// 单元条目通过单元记录自带的 `items_url` 拉取
    pub async fn module_items(&self, items_url: &str) -> Result<Vec<ModuleItemRecord>, ApiError> {
        self.get_paginated(items_url).await
    }

    pub async fn pages(&self, course_id: u64) -> Result<Vec<PageRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/pages", course_id));
        self.get_paginated(&url).await
    }

    /// `page_ref` 可以是页面 slug，也可以是数字 id
    pub async fn page(&self, course_id: u64, page_ref: &str) -> Result<PageRecord, ApiError> {
        let url = self.api_url(&format!("courses/{}/pages/{}", course_id, page_ref));
        self.get_json(&url).await
    }

    pub async fn quizzes(&self, course_id: u64) -> Result<Vec<QuizRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/quizzes", course_id));
        self.get_paginated(&url).await
    }

    pub async fn quiz(&self, course_id: u64, id: u64) -> Result<QuizRecord, ApiError> {
        let url = self.api_url(&format!("courses/{}/quizzes/{}", course_id, id));
        self.get_json(&url).await
    }

    pub async fn folders(&self, course_id: u64) -> Result<Vec<FolderRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/folders", course_id));
        self.get_paginated(&url).await
    }

    pub async fn files(&self, course_id: u64) -> Result<Vec<FileRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/files", course_id));
        self.get_paginated(&url).await
    }

    pub async fn file(&self, course_id: u64, id: u64) -> Result<FileRecord, ApiError> {
        let url = self.api_url(&format!("courses/{}/files/{}", course_id, id));
        self.get_json(&url).await
    }

    pub async fn media_objects(&self, course_id: u64) -> Result<Vec<MediaObjectRecord>, ApiError> {
        let url = self.api_url(&format!("courses/{}/media_objects", course_id));
        self.get_paginated(&url).await
    }
}
