use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use protocol::{
    ErrorResponse, GetRequest, GetResponse, SubmitRequest, SubmitResponse, STATUS_OK,
    STATUS_UNKNOWN, STATUS_WAIT,
};
use solvelib::audit::EventLog;
use solvelib::error::Error;
use solvelib::store::{JobState, JobStore};
use solvelib::types::JobRequest;
use solvelib::JobCoordinator;
use std::sync::Arc;
use std::time::Duration;

/// App name recorded when the caller does not identify itself.
pub const UNKNOWN_APP: &str = "unknown-app";

/// Shared state behind the two endpoints. Submissions go through the
/// coordinator; polls read job state straight off disk, independently of any
/// running subprocess.
#[derive(Clone)]
pub struct SolveService {
    pub coordinator: JobCoordinator,
    pub store: JobStore,
    pub audit: Arc<dyn EventLog>,
    pub retention: Duration,
}

pub async fn submit(
    State(service): State<SolveService>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, (StatusCode, Json<ErrorResponse>)> {
    let job_request = JobRequest {
        model: request.model,
        data: request.data,
        solver: request.solver,
        extra_options: request.conjure_options,
        app_name: request.app_name.unwrap_or_else(|| UNKNOWN_APP.to_string()),
        metadata: request.metadata,
    };
    match service.coordinator.submit(job_request).await {
        Ok(job_id) => Ok(Json(SubmitResponse {
            jobid: job_id.to_string(),
        })),
        Err(e @ (Error::EmptyModel | Error::InvalidSolver(_))) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { err: e.to_string() }),
        )),
        Err(e) => {
            tracing::error!("submit failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    err: "submission failed".to_string(),
                }),
            ))
        }
    }
}

pub async fn get(
    State(service): State<SolveService>,
    Json(request): Json<GetRequest>,
) -> Json<GetResponse> {
    let app_name = request.app_name.unwrap_or_else(|| UNKNOWN_APP.to_string());
    let view = service.store.read(&request.jobid, service.retention).await;
    let (status, err) = match &view.status {
        JobState::Unknown => (STATUS_UNKNOWN.to_string(), None),
        JobState::Wait => (STATUS_WAIT.to_string(), None),
        JobState::Ok => (STATUS_OK.to_string(), None),
        JobState::Terminated(line) => (line.clone(), Some("no solution".to_string())),
    };
    service
        .audit
        .append(&format!("get {} {} - {}", app_name, request.jobid, status));
    Json(GetResponse {
        status,
        solution: view.solution,
        info: view.info,
        logs: view.logs,
        err,
    })
}
