use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stream_response(frames: &[serde_json::Value]) -> ResponseTemplate {
    let body: String = frames.iter().map(|f| format!("data: {f}\n\n")).collect();
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_plain_search_streams_analysis_and_panels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/search/stream"))
        .and(body_json(json!({"query": "corn in Iowa", "max_results": 20})))
        .respond_with(stream_response(&[
            json!({"status": "starting", "message": "Analyzing question"}),
            json!({"keywords": ["corn", "Iowa"]}),
            json!({"chunk": "Iowa leads "}),
            json!({"chunk": "corn production."}),
            json!({
                "status": "complete",
                "query": "corn in Iowa",
                "keywords": ["corn", "Iowa"],
                "sql_results": {
                    "data": [{"state": "Iowa", "yield": 202}],
                    "execution_time": 0.12,
                    "row_count": 1,
                    "interpretation": "Iowa leads corn production."
                },
                "graph_results": {
                    "data": [{"labels": "[:State]", "name": "Iowa", "properties": [], "relationships": []}],
                    "execution_time": 0.34,
                    "row_count": 1
                },
                "total_execution_time": 0.5
            }),
        ]))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("kgx")
        .env("KGX_HOME", home.path())
        .env("KGX_BASE_URL", server.uri())
        .args(["search", "--plain", "--max-results", "20", "corn in Iowa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Iowa leads corn production."))
        .stdout(predicate::str::contains("## Traditional (SQL) (1 rows"))
        .stdout(predicate::str::contains("=== DATA TABLE ==="))
        .stdout(predicate::str::contains("## Knowledge Graph"))
        .stdout(predicate::str::contains("(1 nodes)"))
        .stderr(predicate::str::contains("Analyzing question"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_plain_search_http_error_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "Database offline"})))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("kgx")
        .env("KGX_HOME", home.path())
        .env("KGX_BASE_URL", server.uri())
        .args(["search", "--plain", "corn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 503: Database offline"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_plain_search_in_band_error_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(stream_response(&[json!({"error": "SQL generation failed"})]))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("kgx")
        .env("KGX_HOME", home.path())
        .env("KGX_BASE_URL", server.uri())
        .args(["search", "--plain", "corn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SQL generation failed"));
}

#[test]
fn test_write_keywords_rejected_before_connecting() {
    let home = tempdir().unwrap();
    cargo_bin_cmd!("kgx")
        .env("KGX_HOME", home.path())
        .env("KGX_BASE_URL", "http://127.0.0.1:9")
        .args(["search", "--plain", "drop table crops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid search request"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_command() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("kgx")
        .env("KGX_HOME", home.path())
        .env("KGX_BASE_URL", server.uri())
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("is healthy"));
}
