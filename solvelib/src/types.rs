use uuid::Uuid;

pub type JobId = Uuid;
pub type CacheKey = String;
pub type SolverName = String;
pub type ExtraOptions = Vec<String>;
pub type OutputBlob = bytes::Bytes;

/// One submission, as handed to the coordinator.
#[derive(Clone, Debug)]
pub struct JobRequest {
    pub model: String,
    pub data: Option<serde_json::Value>,
    pub solver: SolverName,
    pub extra_options: ExtraOptions,
    pub app_name: String,
    pub metadata: Option<String>,
}
