use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("source file missing: {0}")]
    SourceMissing(String),

    #[error("audio extraction failed: {0}")]
    ExtractFailure(String),

    #[error("audio enhancement failed: {0}")]
    EnhanceFailure(String),

    #[error("transcription failed: {0}")]
    AsrFailure(String),

    #[error("translation failed: {0}")]
    TranslateFailure(String),

    #[error("speech synthesis failed: {0}")]
    TtsFailure(String),

    #[error("media probe failed: {0}")]
    ProbeFailure(String),

    #[error("media merge failed: {0}")]
    MergeFailure(String),

    #[error("source has no video stream")]
    NoVideoStream,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("queue error: {0}")]
    Queue(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DubError>;
