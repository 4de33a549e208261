//! Client for the conjure-aas API.
//!
//! Wraps the two wire operations into [`ConjureClient::solve`], which submits
//! once and then polls on a bounded backoff schedule until the job leaves
//! `wait`.

pub mod backoff;

use backoff::Backoff;
use protocol::{GetRequest, GetResponse, SubmitRequest, SubmitResponse, DEFAULT_SOLVER};
use serde_json::Value;
use thiserror::Error;

/// Public endpoint used when no domain is given.
pub const DEFAULT_DOMAIN: &str = "https://conjure-aas.cs.st-andrews.ac.uk";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("submission rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Optional knobs for one solve call.
#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// Parameter assignments, e.g. variable values.
    pub data: Option<Value>,
    pub solver: String,
    /// Extra flags forwarded to the solving tool.
    pub conjure_options: Vec<String>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            data: None,
            solver: DEFAULT_SOLVER.to_string(),
            conjure_options: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConjureClient {
    app_name: String,
    domain: String,
    http: reqwest::Client,
}

impl ConjureClient {
    /// A client for the public service. `app_name` identifies your
    /// application in the service's logs.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::with_domain(app_name, DEFAULT_DOMAIN)
    }

    /// A client for a specific deployment.
    pub fn with_domain(app_name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            domain: domain.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Submit a model and return its job id without waiting for the solve.
    pub async fn submit(&self, model: &str, options: &SolveOptions) -> Result<String> {
        let request = SubmitRequest {
            model: model.to_string(),
            data: options.data.clone(),
            solver: options.solver.clone(),
            conjure_options: options.conjure_options.clone(),
            app_name: Some(self.app_name.clone()),
            metadata: None,
        };
        let response = self
            .http
            .post(format!("{}/submit", self.domain))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let err = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected(err));
        }
        let response: SubmitResponse = response.json().await?;
        Ok(response.jobid)
    }

    /// One poll of a job's status.
    pub async fn poll(&self, jobid: &str) -> Result<GetResponse> {
        let request = GetRequest {
            jobid: jobid.to_string(),
            app_name: Some(self.app_name.clone()),
        };
        let response = self
            .http
            .post(format!("{}/get", self.domain))
            .json(&request)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Submit and poll until the job leaves `wait`.
    ///
    /// Delays follow a Luby schedule (500 ms unit, capped at 16 s), so a
    /// long-running job is polled progressively less often.
    pub async fn solve(&self, model: &str, options: &SolveOptions) -> Result<GetResponse> {
        let jobid = self.submit(model, options).await?;
        let mut backoff = Backoff::default();
        loop {
            tokio::time::sleep(backoff.next_delay()).await;
            let response = self.poll(&jobid).await?;
            if response.is_terminal() {
                return Ok(response);
            }
        }
    }
}
