// tests/client_test.rs

use lms_dl::client::RobustClient;
use lms_dl::config::AppConfig;
use lms_dl::error::ApiError;
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use url::Url;

fn client_for(server: &mockito::Server, max_retries: u32) -> RobustClient {
    let config = Arc::new(AppConfig {
        base_url: Url::parse(&server.url()).unwrap(),
        access_token: Some("test-token".into()),
        max_retries,
        ..AppConfig::default()
    });
    RobustClient::new(config).expect("Failed to create client")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_client_retries_transient_server_errors() {
    let mut server = mockito::Server::new_async().await;

    // 第一次请求返回 503，第二次返回 200
    let mock_503 = server
        .mock("GET", "/flaky")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let mock_200 = server
        .mock("GET", "/flaky")
        .with_status(200)
        .with_body("Success!")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, 1);
    let text = client
        .get_text(&format!("{}/flaky", server.url()))
        .await
        .expect("Request should eventually succeed");

    assert_eq!(text, "Success!");
    mock_503.assert_async().await;
    mock_200.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_envelope_message_is_extracted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/courses/404")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(json!({"errors": [{"message": "The specified resource does not exist."}]}).to_string())
        .create_async()
        .await;

    let client = client_for(&server, 0);
    match client.course(404).await {
        Err(ApiError::Status { status, message, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "The specified resource does not exist.");
        }
        other => panic!("expected a status error, got {:?}", other.map(|c| c.id)),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pagination_follows_next_links_with_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let next = format!("{}/api/v1/courses/1/pages?page=2", server.url());

    let first = server
        .mock("GET", "/api/v1/courses/1/pages")
        .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
        .match_header("authorization", "Bearer test-token")
        .with_header("link", &format!("<{}>; rel=\"next\"", next))
        .with_body(json!([{"url": "intro", "title": "Intro"}]).to_string())
        .create_async()
        .await;
    let second = server
        .mock("GET", "/api/v1/courses/1/pages")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_body(json!([{"url": "syllabus", "title": "Syllabus"}]).to_string())
        .create_async()
        .await;

    let client = client_for(&server, 0);
    let pages = client.pages(1).await.expect("pages should load");
    let titles: Vec<_> = pages.iter().filter_map(|p| p.title.clone()).collect();
    assert_eq!(titles, vec!["Intro".to_string(), "Syllabus".to_string()]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_invalid_json_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/courses/2")
        .match_query(Matcher::Any)
        .with_body("<html>login</html>")
        .create_async()
        .await;

    let client = client_for(&server, 0);
    assert!(matches!(client.course(2).await, Err(ApiError::Decode { .. })));
}
