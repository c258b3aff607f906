// tests/download_test.rs

use clap::Parser;
use lms_dl::cli::Cli;
use lms_dl::config::AppConfig;
use lms_dl::downloader::{DownloadManifest, DownloadStats, ResourceDownloader, SaveLayout};
use lms_dl::extractor::classifier::ContentKind;
use lms_dl::extractor::course::CourseRoot;
use lms_dl::extractor::storage_site;
use lms_dl::tree::{ContentNode, Hosting, NodeKind, ROOT, Visibility};
use lms_dl::DownloadJobContext;
use mockito::Matcher;
use std::fs;
use std::path::Path;
use std::sync::{Arc, atomic::AtomicBool};
use tempfile::tempdir;
use url::Url;

fn context_for(server: &mockito::Server, output: &Path) -> DownloadJobContext {
    let config = Arc::new(AppConfig {
        base_url: Url::parse(&server.url()).unwrap(),
        max_retries: 0,
        ..AppConfig::default()
    });
    let args = Cli::try_parse_from([
        "lms-dl",
        "--id",
        "7",
        "--download",
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    DownloadJobContext::new(config, Arc::new(args), Arc::new(AtomicBool::new(false))).unwrap()
}

fn add(root: &CourseRoot, item_id: &str, title: &str, content: ContentNode) {
    let id = root
        .tree
        .attach(ROOT, Some(item_id.into()), Some(title.into()), NodeKind::Content(content))
        .unwrap();
    root.manifest.register(item_id, id, true);
}

fn build_root(server_url: &str) -> CourseRoot {
    let root = CourseRoot::new(7, format!("{}/courses/7", server_url), Some("Bio".into()));
    add(
        &root,
        "1",
        "lecture.pdf",
        ContentNode::new(
            ContentKind::Document,
            Some(format!("{}/files/1/download", server_url)),
            Hosting::Lms,
        ),
    );
    add(
        &root,
        "2",
        "restricted.pdf",
        ContentNode::new(
            ContentKind::Document,
            Some(format!("{}/files/2/download", server_url)),
            Hosting::Lms,
        ),
    );
    let mut hidden = ContentNode::new(
        ContentKind::Document,
        Some(format!("{}/files/3/download", server_url)),
        Hosting::Lms,
    );
    hidden.visibility = Visibility {
        published: false,
        ..Default::default()
    };
    add(&root, "3", "draft.pdf", hidden);
    root
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_falls_back_to_shortcut_and_reruns_are_incremental() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/files/1/download")
        .with_body("PDF-DATA")
        .expect(1)
        .create_async()
        .await;
    let not_found = server
        .mock("GET", "/files/2/download")
        .with_status(404)
        .with_body(r#"{"message":"not found"}"#)
        .expect(1)
        .create_async()
        .await;
    let hidden = server
        .mock("GET", "/files/3/download")
        .expect(0)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let layout = SaveLayout {
        base_dir: dir.path().to_path_buf(),
        flatten: false,
        date: "2024-01-01".into(),
    };
    let root = build_root(&server.url());
    let course_dir = dir.path().join("Bio (2024-01-01)");

    // 第一次运行: 一个成功、一个快捷方式、一个因隐藏而跳过
    let context = context_for(&server, dir.path());
    let all_ok = ResourceDownloader::new(context.clone())
        .download(&root, &layout)
        .await
        .unwrap();
    assert!(all_ok);
    assert_eq!(
        context.manager.get_stats(),
        DownloadStats {
            total: 3,
            success: 1,
            shortcut: 1,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(fs::read_to_string(course_dir.join("lecture.pdf")).unwrap(), "PDF-DATA");
    assert!(!course_dir.join("restricted.pdf").exists());
    let shortcut = fs::read_to_string(course_dir.join("restricted.pdf.url")).unwrap();
    assert!(shortcut.contains(&format!("URL={}/files/2/download", server.url())));
    assert!(!course_dir.join("draft.pdf").exists());

    let manifest = DownloadManifest::load_or_create(dir.path()).unwrap();
    assert_eq!(manifest.len(), 2);
    drop(manifest);

    // 第二次运行: 清单中的内容不再传输
    let context = context_for(&server, dir.path());
    ResourceDownloader::new(context.clone())
        .download(&root, &layout)
        .await
        .unwrap();
    assert_eq!(context.manager.get_stats().skipped, 3);
    assert_eq!(context.manager.get_stats().success, 0);

    ok.assert_async().await;
    not_found.assert_async().await;
    hidden.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_errors_are_reported_and_retried_next_run() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/files/9/download")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let layout = SaveLayout {
        base_dir: dir.path().to_path_buf(),
        flatten: true,
        date: "2024-01-01".into(),
    };
    let root = CourseRoot::new(7, format!("{}/courses/7", server.url()), Some("Bio".into()));
    add(
        &root,
        "9",
        "broken.pdf",
        ContentNode::new(
            ContentKind::Document,
            Some(format!("{}/files/9/download", server.url())),
            Hosting::Lms,
        ),
    );

    for _ in 0..2 {
        let context = context_for(&server, dir.path());
        let all_ok = ResourceDownloader::new(context.clone())
            .download(&root, &layout)
            .await
            .unwrap();
        assert!(!all_ok);
        assert_eq!(context.manager.get_stats().failed, 1);
    }

    let manifest = DownloadManifest::load_or_create(dir.path()).unwrap();
    assert!(manifest.is_empty());
    assert!(!dir.path().join("Bio (2024-01-01)").join("broken.pdf.url").exists());
    failing.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_site_content_is_saved_as_shortcut_without_transfer() {
    let server = mockito::Server::new_async().await;
    let dir = tempdir().unwrap();
    let layout = SaveLayout {
        base_dir: dir.path().to_path_buf(),
        flatten: false,
        date: "2024-01-01".into(),
    };
    let root = CourseRoot::new(7, format!("{}/courses/7", server.url()), Some("Bio".into()));
    add(
        &root,
        "yt",
        "Lecture recording",
        ContentNode::new(
            ContentKind::VideoSite,
            Some("https://www.youtube.com/watch?v=abc".into()),
            Hosting::External,
        ),
    );

    let context = context_for(&server, dir.path());
    ResourceDownloader::new(context.clone())
        .download(&root, &layout)
        .await
        .unwrap();
    assert_eq!(context.manager.get_stats().shortcut, 1);
    let shortcut = dir
        .path()
        .join("Bio (2024-01-01)")
        .join("Lecture recording.url");
    assert!(fs::read_to_string(shortcut).unwrap().contains("youtube.com/watch?v=abc"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_storage_site_children_transfer_from_direct_download_address() {
    let mut server = mockito::Server::new_async().await;
    let share_url = format!("{}/s/abc123", server.url());
    let viewer_url = format!("{}/file/11", share_url);
    let download_url = storage_site::box_download_url(&share_url, "11").unwrap();
    let direct = server
        .mock("GET", "/index.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("rm".into(), "box_download_shared_file".into()),
            Matcher::UrlEncoded("shared_name".into(), "abc123".into()),
            Matcher::UrlEncoded("file_id".into(), "f_11".into()),
        ]))
        .with_body("%PDF-1.7")
        .expect(1)
        .create_async()
        .await;
    let viewer = server
        .mock("GET", "/s/abc123/file/11")
        .with_body("<html>viewer</html>")
        .expect(0)
        .create_async()
        .await;

    let root = CourseRoot::new(7, format!("{}/courses/7", server.url()), Some("Bio".into()));
    let site = root
        .tree
        .attach(
            ROOT,
            Some("share".into()),
            Some("Shared readings".into()),
            NodeKind::Content(ContentNode::new(
                ContentKind::FileStorageSite,
                Some(share_url.clone()),
                Hosting::External,
            )),
        )
        .unwrap();
    root.manifest.register("share", site, true);
    let mut syllabus = ContentNode::new(ContentKind::Document, Some(viewer_url.clone()), Hosting::External);
    syllabus.download_url = Some(download_url.clone());
    let child = root
        .tree
        .attach(
            site,
            Some("box_11".into()),
            Some("Syllabus.pdf".into()),
            NodeKind::Content(syllabus),
        )
        .unwrap();
    root.manifest.register("box_11", child, true);

    let dir = tempdir().unwrap();
    let layout = SaveLayout {
        base_dir: dir.path().to_path_buf(),
        flatten: false,
        date: "2024-01-01".into(),
    };
    let context = context_for(&server, dir.path());
    let downloader = ResourceDownloader::new(context.clone());

    let manifest = DownloadManifest::load_or_create(dir.path()).unwrap();
    let plan = downloader.plan(&root, &layout, &manifest);
    drop(manifest);
    assert!(plan.skipped.is_empty());
    let task = plan
        .tasks
        .iter()
        .find(|t| t.source_url == viewer_url)
        .expect("child planned");
    assert_eq!(task.url, download_url);
    assert!(!task.force_shortcut);
    let site_task = plan.tasks.iter().find(|t| t.source_url == share_url).unwrap();
    assert!(site_task.force_shortcut);

    let all_ok = downloader.download(&root, &layout).await.unwrap();
    assert!(all_ok);
    assert_eq!(fs::read_to_string(&task.filepath).unwrap(), "%PDF-1.7");
    assert_eq!(context.manager.get_stats().shortcut, 1);
    assert_eq!(context.manager.get_stats().success, 1);
    direct.assert_async().await;
    viewer.assert_async().await;
}
