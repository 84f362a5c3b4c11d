use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForwarderError>;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
    #[error("invalid upstream server: {0}")]
    InvalidUpstreamServer(String),
    #[error("invalid http bind address: {0}")]
    InvalidHttpBindAddress(String),
    #[error("invalid worker threads: {0}")]
    InvalidWorkerThreads(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid max concurrent queries: {0}")]
    InvalidMaxConcurrentQueries(String),
}

/// Errors that can escape to the top of `main`: config load, runtime
/// construction, and listener/socket binds. The query FSM itself never
/// returns one of these; per the error handling design, its own failures are
/// turned into metrics, a SERVFAIL, or silence before they get this far.
#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
