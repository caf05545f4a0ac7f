use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("ledger not found at {0}: the ledger is the source of truth and cannot be synthesized")]
    LedgerNotFound(PathBuf),

    #[error("ledger corrupt: {0}")]
    LedgerCorrupt(String),

    #[error("release not found in ledger: {0}")]
    ReleaseNotFound(String),

    #[error("unknown component name: {0}")]
    UnknownComponent(String),

    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<RolloutError>,
    },

    #[error("custody service unavailable: {0}")]
    CustodyUnavailable(String),

    #[error("'{label}' failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        label: String,
        attempts: u32,
        last_error: String,
    },

    #[error("artifact verification failed: {0}")]
    VerificationFailed(String),

    #[error("chain rpc error: {0}")]
    Rpc(String),

    #[error("artifact not found for component '{component}' in {dir}")]
    ArtifactNotFound { component: String, dir: PathBuf },

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("invalid signer key: {0}")]
    InvalidSignerKey(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RolloutError>;
