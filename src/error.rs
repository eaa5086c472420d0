use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown output format '{0}' (expected console or json)")]
    UnknownFormat(String),
}
