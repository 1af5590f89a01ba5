/// Integration tests with a mocked model hub
/// Exercises artifact download, the fetch-once cache and folder publishing
/// without hitting the real hub
use std::sync::Arc;
use tourism_predict::artifact_validator::compute_checksum;
use tourism_predict::hub_client::{ArtifactRef, HubClient, RepoRef, RepoType};
use tourism_predict::model_loader::{ModelError, ModelLoader, ModelSource};
use tourism_predict::publisher::{PublishError, Publisher, MAX_INLINE_FILE_BYTES};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE: &[u8] = include_bytes!("fixtures/model.json");
const RESOLVE_PATH: &str = "/acme/tourism-clf/resolve/main/model.json";

fn hub_source() -> ModelSource {
    ModelSource::Hub(ArtifactRef {
        repo_id: "acme/tourism-clf".to_string(),
        filename: "model.json".to_string(),
        revision: "main".to_string(),
    })
}

fn create_test_loader(
    hub_uri: String,
    cache_dir: &std::path::Path,
    expected_sha256: Option<String>,
) -> ModelLoader {
    let hub = HubClient::new(hub_uri, Some("test_token".to_string())).unwrap();
    ModelLoader::new(hub, cache_dir.to_path_buf(), expected_sha256)
}

fn space() -> RepoRef {
    RepoRef {
        repo_id: "acme/tourism-app".to_string(),
        repo_type: RepoType::Space,
    }
}

#[tokio::test]
async fn test_model_downloaded_once_and_shared() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .and(header("Authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FIXTURE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), None);

    let first = loader.load(&hub_source()).await.unwrap();
    let second = loader.load(&hub_source()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.columns.len(), 18);
    assert_eq!(loader.cached_models().await, 1);
    assert!(cache
        .path()
        .join("acme--tourism-clf/main/model.json")
        .is_file());
}

#[tokio::test]
async fn test_concurrent_first_loads_fetch_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(FIXTURE)
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), None);
    let source = hub_source();

    let (a, b) = tokio::join!(loader.load(&source), loader.load(&source));
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
}

#[tokio::test]
async fn test_pinned_digest_accepted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FIXTURE))
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let digest = compute_checksum(FIXTURE).to_uppercase();
    let loader = create_test_loader(mock_server.uri(), cache.path(), Some(digest));

    assert!(loader.load(&hub_source()).await.is_ok());
}

#[tokio::test]
async fn test_digest_mismatch_is_integrity_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FIXTURE))
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), Some("ab".repeat(32)));

    let err = loader.load(&hub_source()).await.unwrap_err();
    assert!(matches!(err, ModelError::Integrity(_)), "{:?}", err);
    assert_eq!(loader.cached_models().await, 0);
}

#[tokio::test]
async fn test_missing_artifact_is_fetch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("Entry not found"))
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), None);

    let err = loader.load(&hub_source()).await.unwrap_err();
    assert!(matches!(err, ModelError::Fetch(_)), "{:?}", err);
    assert!(!cache
        .path()
        .join("acme--tourism-clf/main/model.json")
        .exists());
}

#[tokio::test]
async fn test_corrupt_artifact_is_deserialize_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"\x80\x04\x95joblib"[..]))
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), None);

    let err = loader.load(&hub_source()).await.unwrap_err();
    assert!(matches!(err, ModelError::Deserialize(_)), "{:?}", err);
}

#[tokio::test]
async fn test_failed_load_is_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FIXTURE))
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), None);

    assert!(loader.load(&hub_source()).await.is_err());
    assert!(loader.load(&hub_source()).await.is_ok());
}

#[tokio::test]
async fn test_local_model_file_loaded_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let loader = create_test_loader(mock_server.uri(), cache.path(), None);
    let source = ModelSource::File(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/model.json"),
    );

    let first = loader.load(&source).await.unwrap();
    let second = loader.load(&source).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.columns.len(), 18);
    assert_eq!(loader.cached_models().await, 1);
}

#[tokio::test]
async fn test_publish_folder_in_one_commit() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/spaces/acme/tourism-app/commit/main"))
        .and(header("Authorization", "Bearer test_token"))
        .and(header("Content-Type", "application/x-ndjson"))
        .and(body_string_contains("\"path\":\"Dockerfile\""))
        .and(body_string_contains("\"path\":\"static/app.css\""))
        // base64("FROM scratch")
        .and(body_string_contains("RlJPTSBzY3JhdGNo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "commitUrl": "https://hub.test/spaces/acme/tourism-app/commit/abc123",
            "commitOid": "abc123"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("static")).unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM scratch").unwrap();
    std::fs::write(dir.path().join("static/app.css"), "body{}").unwrap();

    let hub = HubClient::new(mock_server.uri(), Some("test_token".to_string())).unwrap();
    let report = Publisher::new(hub)
        .publish(dir.path(), &space(), "main", ".")
        .await
        .unwrap();

    assert_eq!(report.url, format!("{}/spaces/acme/tourism-app", mock_server.uri()));
    assert_eq!(report.files, 2);
    assert_eq!(report.bytes, 18);
    assert_eq!(
        report.commit_url.as_deref(),
        Some("https://hub.test/spaces/acme/tourism-app/commit/abc123")
    );
}

#[tokio::test]
async fn test_publish_empty_folder_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let hub = HubClient::new(mock_server.uri(), Some("test_token".to_string())).unwrap();

    let err = Publisher::new(hub)
        .publish(dir.path(), &space(), "main", ".")
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::EmptyFolder(_)));
}

#[tokio::test]
async fn test_publish_oversized_file_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("README.md"), "# app").unwrap();
    let weights = std::fs::File::create(dir.path().join("weights.bin")).unwrap();
    weights.set_len(MAX_INLINE_FILE_BYTES + 1).unwrap();

    let hub = HubClient::new(mock_server.uri(), Some("test_token".to_string())).unwrap();
    let err = Publisher::new(hub)
        .publish(dir.path(), &space(), "main", ".")
        .await
        .unwrap_err();
    match err {
        PublishError::FileTooLarge { path, bytes } => {
            assert!(path.ends_with("weights.bin"));
            assert_eq!(bytes, MAX_INLINE_FILE_BYTES + 1);
        }
        other => panic!("expected file too large, got {:?}", other),
    }
}

#[tokio::test]
async fn test_publish_rejected_by_hub() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/spaces/acme/tourism-app/commit/main"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("README.md"), "# app").unwrap();
    let hub = HubClient::new(mock_server.uri(), Some("bad_token".to_string())).unwrap();

    let err = Publisher::new(hub)
        .publish(dir.path(), &space(), "main", ".")
        .await
        .unwrap_err();
    match err {
        PublishError::Upload(msg) => assert!(msg.contains("401"), "{}", msg),
        other => panic!("expected upload error, got {:?}", other),
    }
}
