use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a single page could not be retrieved.
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Transport(String),
}

/// A transport-level failure for one URL. Emitted once on the errors stream,
/// never retried.
#[derive(Error, Debug)]
#[error("fetching {url} failed: {source}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub source: FetchFailure,
}

impl FetchError {
    pub fn new(url: impl Into<String>, source: impl Into<FetchFailure>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }
}
