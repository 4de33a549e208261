//! Wire types for the two job-server operations.
//!
//! Field names are part of the public contract and must not drift: deployed
//! clients send `model`, `jobid`, `appName` and `conjureOptions` (or the
//! older `conjure_options`) exactly as spelled here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Solver used when a submission does not name one.
pub const DEFAULT_SOLVER: &str = "kissat";

/// Status reported while a job is still running.
pub const STATUS_WAIT: &str = "wait";
/// Status reported when a solution is available.
pub const STATUS_OK: &str = "ok";
/// Status reported for absent or expired jobs.
pub const STATUS_UNKNOWN: &str = "unknown";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub model: String,
    /// Auxiliary input, e.g. parameter assignments; a string or any JSON
    /// value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default = "default_solver")]
    pub solver: String,
    /// Extra flags forwarded to the solving tool, in order.
    #[serde(
        default,
        rename = "conjureOptions",
        alias = "conjure_options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub conjure_options: Vec<String>,
    /// Identifies the calling application in the server's logs.
    #[serde(default, rename = "appName", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Opaque string persisted alongside the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

fn default_solver() -> String {
    DEFAULT_SOLVER.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub jobid: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetRequest {
    pub jobid: String,
    #[serde(default, rename = "appName", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

/// Response to a poll. `status` is `wait`, `ok`, `unknown` or the recorded
/// terminal status line; the remaining fields are best-effort and omitted
/// when empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl GetResponse {
    /// Whether polling should stop: anything but `wait` is final from the
    /// client's point of view.
    pub fn is_terminal(&self) -> bool {
        self.status != STATUS_WAIT
    }
}

/// Body of a synchronous rejection (e.g. an empty model).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub err: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_defaults() {
        let req: SubmitRequest = serde_json::from_value(json!({"model": "find x : int(1..3)"})).unwrap();
        assert_eq!(req.solver, DEFAULT_SOLVER);
        assert!(req.conjure_options.is_empty());
        assert!(req.data.is_none());
        assert!(req.app_name.is_none());
    }

    #[test]
    fn options_accept_both_spellings() {
        let camel: SubmitRequest =
            serde_json::from_value(json!({"model": "m", "conjureOptions": ["--a", "--b"]})).unwrap();
        let snake: SubmitRequest =
            serde_json::from_value(json!({"model": "m", "conjure_options": ["--a", "--b"]})).unwrap();
        assert_eq!(camel.conjure_options, snake.conjure_options);

        // the current spelling is what we emit
        let wire = serde_json::to_value(&camel).unwrap();
        assert!(wire.get("conjureOptions").is_some());
        assert!(wire.get("conjure_options").is_none());
    }

    #[test]
    fn get_response_omits_empty_fields() {
        let response = GetResponse {
            status: STATUS_UNKNOWN.to_string(),
            solution: None,
            info: BTreeMap::new(),
            logs: Vec::new(),
            err: None,
        };
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({"status": "unknown"}));
    }

    #[test]
    fn wait_is_the_only_non_terminal_status() {
        let wait: GetResponse = serde_json::from_value(json!({"status": "wait"})).unwrap();
        assert!(!wait.is_terminal());
        let done: GetResponse =
            serde_json::from_value(json!({"status": "terminated - exitcode 1"})).unwrap();
        assert!(done.is_terminal());
    }
}
