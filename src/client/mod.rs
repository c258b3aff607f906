// src/client/mod.rs

mod endpoints;

use crate::{
    config::AppConfig,
    error::{ApiError, AppResult},
    models::api::ErrorEnvelope,
    utils,
};
use log::{debug, trace};
use regex::Regex;
use reqwest::{Response, header};
use reqwest_middleware::RequestBuilder;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;
use url::Url;

static NEXT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).unwrap());

/// 带重试和并发上限的 HTTP 客户端，同时充当 LMS 的 API 网关。
#[derive(Clone)]
pub struct RobustClient {
    pub client: ClientWithMiddleware,
    config: Arc<AppConfig>,
    permits: Arc<Semaphore>,
}

impl RobustClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(
            reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .connect_timeout(config.connect_timeout)
                .timeout(config.timeout)
                .pool_max_idle_per_host(config.max_workers * 3)
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        let permits = Arc::new(Semaphore::new(config.max_workers.max(1)));
        Ok(Self { client, config, permits })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// URL 是否属于当前 LMS 站点
    pub fn is_lms_url(&self, url: &Url) -> bool {
        utils::same_host(url, &self.config.base_url)
    }

    /// 访问令牌只发送给 LMS 站点本身
    pub fn authorize(&self, request: RequestBuilder, url: &Url) -> RequestBuilder {
        match self.config.access_token.as_deref() {
            Some(token) if !token.is_empty() && self.is_lms_url(url) => request.bearer_auth(token),
            _ => request,
        }
    }

    pub fn parse_http_url(url_str: &str) -> Result<Url, ApiError> {
        let url = Url::parse(url_str).map_err(|e| ApiError::InvalidUrl {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: url_str.to_string(),
                reason: format!("不支持的协议 '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    /// 发起 GET 请求；非 2xx 响应会被转换为带错误信息的 `ApiError::Status`。
    pub async fn get(&self, url_str: &str) -> Result<Response, ApiError> {
        let url = Self::parse_http_url(url_str)?;
        trace!("GET {}", url);
        let request = self.authorize(self.client.get(url.clone()), &url);
        let res = request.send().await.map_err(|source| ApiError::Connection {
            url: url_str.to_string(),
            source,
        })?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|env| env.message())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("未知错误").to_string());
        debug!("请求 '{}' 失败: HTTP {} {}", url_str, status.as_u16(), message);
        Err(ApiError::Status {
            url: url_str.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn read_text(url_str: &str, res: Response) -> Result<String, ApiError> {
        res.text().await.map_err(|e| ApiError::Connection {
            url: url_str.to_string(),
            source: reqwest_middleware::Error::Reqwest(e),
        })
    }

    pub async fn get_text(&self, url_str: &str) -> Result<String, ApiError> {
        let _permit = self.permits.acquire().await.map_err(|_| ApiError::Cancelled)?;
        let res = self.get(url_str).await?;
        Self::read_text(url_str, res).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url_str: &str) -> Result<T, ApiError> {
        let text = self.get_text(url_str).await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url_str.to_string(),
            source,
        })
    }

    /// 拉取分页列表，沿 `Link: rel="next"` 翻页，最多 `max_pages` 页。
    pub async fn get_paginated<T: DeserializeOwned>(&self, url_str: &str) -> Result<Vec<T>, ApiError> {
        let mut results = Vec::new();
        let mut next = Some(self.with_per_page(url_str)?);
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            if pages >= self.config.max_pages {
                debug!("分页数量达到上限 {}，停止翻页: {}", self.config.max_pages, url_str);
                break;
            }
            pages += 1;

            let _permit = self.permits.acquire().await.map_err(|_| ApiError::Cancelled)?;
            let res = self.get(&page_url).await?;
            next = res
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);
            let text = Self::read_text(&page_url, res).await?;
            let mut page: Vec<T> = serde_json::from_str(&text).map_err(|source| ApiError::Decode {
                url: page_url.clone(),
                source,
            })?;
            results.append(&mut page);
        }
        Ok(results)
    }

    fn with_per_page(&self, url_str: &str) -> Result<String, ApiError> {
        let mut url = Self::parse_http_url(url_str)?;
        if !url.query_pairs().any(|(k, _)| k == "per_page") {
            url.query_pairs_mut()
                .append_pair("per_page", &self.config.per_page.to_string());
        }
        Ok(url.to_string())
    }

    /// 拼出 `{base}/api/v1/{path}` 形式的地址
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_next_link(link_header: &str) -> Option<String> {
    NEXT_LINK_RE
        .captures(link_header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://lms/api/v1/courses/1/pages?page=1&per_page=10>; rel="current",<https://lms/api/v1/courses/1/pages?page=2&per_page=10>; rel="next",<https://lms/api/v1/courses/1/pages?page=1&per_page=10>; rel="first""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://lms/api/v1/courses/1/pages?page=2&per_page=10")
        );
        assert_eq!(parse_next_link(r#"<https://lms/x>; rel="last""#), None);
    }

    #[test]
    fn test_parse_http_url_rejects_other_schemes() {
        assert!(RobustClient::parse_http_url("https://lms/x").is_ok());
        assert!(matches!(
            RobustClient::parse_http_url("ftp://lms/x"),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RobustClient::parse_http_url("/relative/path"),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_token_is_only_attached_to_lms_host() {
        let config = Arc::new(AppConfig {
            access_token: Some("secret".into()),
            ..AppConfig::default()
        });
        let client = RobustClient::new(config).unwrap();
        let lms = Url::parse("https://lms.example.edu/files/1").unwrap();
        let other = Url::parse("https://cdn.example.com/files/1").unwrap();

        let req = client.authorize(client.client.get(lms.clone()), &lms).build().unwrap();
        assert!(req.headers().contains_key(header::AUTHORIZATION));
        let req = client.authorize(client.client.get(other.clone()), &other).build().unwrap();
        assert!(!req.headers().contains_key(header::AUTHORIZATION));
    }
}
