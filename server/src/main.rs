mod config;
mod services;

use anyhow::Context;
use axum::routing::post;
use axum::Router;
use clap::Parser;
use config::ServerConfig;
use services::solve::{self, SolveService};
use solvelib::audit::{EventLog, FileEventLog};
use solvelib::cache::ModelCache;
use solvelib::store::JobStore;
use solvelib::{JobCoordinator, SolverCommand};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,solvelib=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();
    let audit: Arc<dyn EventLog> =
        Arc::new(FileEventLog::open(&config.log_file).context("opening the audit log")?);
    let app = build_app(&config, audit);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!("listening on {}", config.listen);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Assemble the router. `main` and the tests share this, so both run the
/// exact same stack.
fn build_app(config: &ServerConfig, audit: Arc<dyn EventLog>) -> Router {
    let store = JobStore::new(&config.output_dir);
    let cache = ModelCache::new(&config.cache_dir);
    let coordinator = JobCoordinator::spawn(
        SolverCommand {
            program: config.conjure_bin.clone(),
        },
        store.clone(),
        cache,
        audit.clone(),
        config.queue_capacity,
    );
    let service = SolveService {
        coordinator,
        store,
        audit,
        retention: config.retention(),
    };
    Router::new()
        .route("/submit", post(solve::submit))
        .route("/get", post(solve::get))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{GetResponse, SubmitResponse};
    use solvelib::audit::MemoryEventLog;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    const FAKE_SOLVER: &str = r#"#!/bin/sh
dir=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "--output-directory" ]; then dir="$arg"; fi
    prev="$arg"
done
echo "translating model"
echo "checksum" > "$dir/.conjure-checksum"
echo "compiled" > "$dir/model000001.eprime"
printf 'SolverTotalTime: 0.01\n' > "$dir/model000001-data.eprime-info"
printf '{"x": 2}' > "$dir/model000001-data.solutions.json"
exit 0
"#;

    const FAILING_SOLVER: &str = r#"#!/bin/sh
echo "parse error in model" >&2
exit 1
"#;

    struct TestServer {
        base: String,
        audit: Arc<MemoryEventLog>,
        _tmp: tempfile::TempDir,
    }

    async fn start_server(script: &str) -> TestServer {
        let tmp = tempfile::tempdir().unwrap();
        let program = tmp.path().join("fake-conjure");
        std::fs::write(&program, script).unwrap();
        let mut perms = std::fs::metadata(&program).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&program, perms).unwrap();

        let config = ServerConfig::parse_from([
            "server",
            "--listen",
            "127.0.0.1:0",
            "--output-dir",
            tmp.path().join("conjure-output").to_str().unwrap(),
            "--cache-dir",
            tmp.path().join("model-cache").to_str().unwrap(),
            "--log-file",
            tmp.path().join("logs.txt").to_str().unwrap(),
            "--static-dir",
            tmp.path().join("static").to_str().unwrap(),
            "--conjure-bin",
            program.to_str().unwrap(),
        ]);
        let audit = Arc::new(MemoryEventLog::default());
        let app = build_app(&config, audit.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TestServer {
            base: format!("http://{addr}"),
            audit,
            _tmp: tmp,
        }
    }

    async fn poll_until_settled(base: &str, jobid: &str) -> GetResponse {
        let http = reqwest::Client::new();
        for _ in 0..200 {
            let response: GetResponse = http
                .post(format!("{base}/get"))
                .json(&serde_json::json!({"jobid": jobid, "appName": "wire-test"}))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if response.is_terminal() {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {jobid} never left wait");
    }

    #[tokio::test]
    async fn submit_then_poll_to_ok() {
        let server = start_server(FAKE_SOLVER).await;
        let http = reqwest::Client::new();
        let submitted: SubmitResponse = http
            .post(format!("{}/submit", server.base))
            .json(&serde_json::json!({
                "model": "find x : int(1..3) such that x > 1",
                "appName": "wire-test",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let response = poll_until_settled(&server.base, &submitted.jobid).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.solution, Some(serde_json::json!({"x": 2})));
        assert!(!response.logs.is_empty());
        assert!(server
            .audit
            .events()
            .iter()
            .any(|e| e.starts_with("submit wire-test")));
    }

    #[tokio::test]
    async fn legacy_option_spelling_is_accepted() {
        let server = start_server(FAKE_SOLVER).await;
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{}/submit", server.base))
            .json(&serde_json::json!({
                "model": "find x : int(1..3)",
                "conjure_options": ["--log-level", "2"],
            }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let submitted: SubmitResponse = response.json().await.unwrap();
        let response = poll_until_settled(&server.base, &submitted.jobid).await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn empty_model_is_rejected() {
        let server = start_server(FAKE_SOLVER).await;
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{}/submit", server.base))
            .json(&serde_json::json!({"model": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body.get("err").is_some());
    }

    #[tokio::test]
    async fn unknown_job_polls_unknown() {
        let server = start_server(FAKE_SOLVER).await;
        let http = reqwest::Client::new();
        for jobid in ["not-a-job", "d2f4a1de-0000-0000-0000-000000000000"] {
            let response: GetResponse = http
                .post(format!("{}/get", server.base))
                .json(&serde_json::json!({"jobid": jobid}))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(response.status, "unknown");
            assert!(response.logs.is_empty());
        }
    }

    #[tokio::test]
    async fn failing_solver_reports_terminated_status() {
        let server = start_server(FAILING_SOLVER).await;
        let http = reqwest::Client::new();
        let submitted: SubmitResponse = http
            .post(format!("{}/submit", server.base))
            .json(&serde_json::json!({"model": "rubbish"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let response = poll_until_settled(&server.base, &submitted.jobid).await;
        assert_eq!(response.status, "terminated - exitcode 1");
        assert!(response.err.is_some());
        assert!(response.logs.iter().any(|l| l.contains("parse error")));
        assert!(response.solution.is_none());
    }
}
