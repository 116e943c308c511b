//! Web service runner against a mocked scanner service

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use credsift::config::WebServiceConfig;
use credsift::infrastructure::runners::WebServiceRunner;
use credsift::infrastructure::Runner;

fn config(host: &str, envfile: Option<PathBuf>) -> WebServiceConfig {
    WebServiceConfig {
        host: host.trim_end_matches('/').to_string(),
        envfile,
        certificate_validation: Some(true),
    }
}

fn credentials_file(auth_key: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "AUTH_KEY={auth_key}").unwrap();
    file
}

fn target_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "password = \"hunter2\"").unwrap();
    file
}

fn discovery_record(id: u64, with_rule: bool) -> serde_json::Value {
    let mut record = json!({
        "id": id.to_string(),
        "file_name": "a.js",
        "commit_id": "",
        "line_number": "1",
        "snippet": "password = \"hunter2\"",
        "repo_url": "local",
        "state": "new",
        "timestamp": "2024-05-01T10:00:00Z",
    });
    if with_rule {
        record["rule_id"] = json!("9");
        record["rule_regex"] = json!("password");
        record["rule_category"] = json!("password");
        record["rule_description"] = json!("Plaintext password");
    }
    record
}

#[tokio::test]
async fn test_scan_logs_in_and_caches_decoded_discoveries() {
    let server = MockServer::start().await;
    let credentials = credentials_file("s3cret");
    let target = target_file();

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("auth_key=s3cret"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/"))
        .expect(1)
        .mount(&server)
        .await;

    // One well-formed record and one without rule detail; the latter is
    // dropped during decoding.
    Mock::given(method("POST"))
        .and(path("/scan_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            discovery_record(12, true),
            discovery_record(13, false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(
        &server.uri(),
        Some(credentials.path().to_path_buf()),
    ))
    .unwrap();

    let count = runner.scan(target.path()).await.unwrap();
    assert_eq!(count, 1);

    let discoveries = runner.get_discoveries(Path::new("/unused")).await.unwrap();
    assert_eq!(discoveries.len(), 1);
    assert_eq!(discoveries[0].id, 12);
    assert_eq!(discoveries[0].line_number, 1);
    assert_eq!(discoveries[0].rule.as_ref().unwrap().regex, "password");

    runner.cleanup().await;
}

#[tokio::test]
async fn test_insecure_mode_skips_login() {
    let server = MockServer::start().await;
    let target = target_file();

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(302))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/scan_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();
    assert_eq!(runner.scan(target.path()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_login_surfaces_status() {
    let server = MockServer::start().await;
    let credentials = credentials_file("wrong");
    let target = target_file();

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(
        &server.uri(),
        Some(credentials.path().to_path_buf()),
    ))
    .unwrap();

    let err = runner.scan(target.path()).await.unwrap_err();
    assert!(err.to_string().contains("Authentication"));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_non_json_scan_response_is_rejected() {
    let server = MockServer::start().await;
    let target = target_file();

    // A 200 that is not JSON (e.g. an HTML error page) must not be decoded.
    Mock::given(method("POST"))
        .and(path("/scan_file"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html>scanner busy</html>"),
        )
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();
    let err = runner.scan(target.path()).await.unwrap_err();
    assert!(err.to_string().contains("rejected"));
}

#[tokio::test]
async fn test_scan_error_status_is_rejected() {
    let server = MockServer::start().await;
    let target = target_file();

    Mock::given(method("POST"))
        .and(path("/scan_file"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();
    let err = runner.scan(target.path()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_get_discoveries_before_scan_is_empty() {
    let server = MockServer::start().await;
    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();

    let discoveries = runner.get_discoveries(Path::new("/unused")).await.unwrap();
    assert!(discoveries.is_empty());
}

#[tokio::test]
async fn test_add_rules_redirect_means_accepted() {
    let server = MockServer::start().await;
    let rules = target_file();

    Mock::given(method("POST"))
        .and(path("/upload_rule"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/rules"))
        .expect(1)
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();
    runner.validate_and_set_rules(rules.path()).unwrap();
    assert!(runner.add_rules().await.unwrap());
}

#[tokio::test]
async fn test_add_rules_plain_response_means_not_accepted() {
    let server = MockServer::start().await;
    let rules = target_file();

    Mock::given(method("POST"))
        .and(path("/upload_rule"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();
    runner.validate_and_set_rules(rules.path()).unwrap();
    assert!(!runner.add_rules().await.unwrap());
}

#[tokio::test]
async fn test_add_rules_without_rules_set_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload_rule"))
        .respond_with(ResponseTemplate::new(302))
        .expect(0)
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(&server.uri(), None)).unwrap();
    assert!(!runner.add_rules().await.unwrap());
}

#[tokio::test]
async fn test_credentials_file_without_auth_key_runs_unauthenticated() {
    let server = MockServer::start().await;
    let target = target_file();

    let mut credentials = NamedTempFile::new().unwrap();
    writeln!(credentials, "OTHER_KEY=value").unwrap();

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(302))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/scan_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut runner = WebServiceRunner::new(config(
        &server.uri(),
        Some(credentials.path().to_path_buf()),
    ))
    .unwrap();
    assert_eq!(runner.scan(target.path()).await.unwrap(), 0);
}
