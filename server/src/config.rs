use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Job server wrapping the `conjure` constraint-modelling tool.
#[derive(Clone, Debug, Parser)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "CONJURE_AAS_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Directory holding one workspace per job
    #[arg(long, env = "CONJURE_AAS_OUTPUT_DIR", default_value = "conjure-output")]
    pub output_dir: PathBuf,

    /// Directory holding the compiled-model cache
    #[arg(long, env = "CONJURE_AAS_CACHE_DIR", default_value = "model-cache")]
    pub cache_dir: PathBuf,

    /// Flat file receiving one line per submission, completion and poll
    #[arg(long, env = "CONJURE_AAS_LOG_FILE", default_value = "logs.txt")]
    pub log_file: PathBuf,

    /// Directory of static files served next to the API
    #[arg(long, env = "CONJURE_AAS_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Solver driver binary
    #[arg(long, env = "CONJURE_AAS_CONJURE_BIN", default_value = "conjure")]
    pub conjure_bin: PathBuf,

    /// Seconds a job remains pollable after it was last touched
    #[arg(long, env = "CONJURE_AAS_RETENTION_SECS", default_value_t = 600)]
    pub retention_secs: u64,

    /// Capacity of the coordinator's message queue
    #[arg(long, env = "CONJURE_AAS_QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,
}

impl ServerConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
