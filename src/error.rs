use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Http error")]
    HttpError(#[from] reqwest::Error),

    #[error("Io error")]
    IoError(#[from] std::io::Error),

    #[error("Json error")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed snapshot {path}")]
    MalformedSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid url: {0}")]
    InvalidUrl(String),
}
