// ================================================================
// File: gachabot-common/src/error.rs
// ================================================================

use thiserror::Error;

/// Which uniqueness constraint a duplicate write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Banner,
    ThreadBinding,
    Medal,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DuplicateKind::Banner => "banner",
            DuplicateKind::ThreadBinding => "thread binding",
            DuplicateKind::Medal => "medal",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// Snapshot source failed or returned garbage. Retried by the scrape job.
    #[error("Snapshot source error: {0}")]
    Source(String),

    /// One chat-platform call failed. The reconcile pass skips that banner
    /// and keeps going.
    #[error("Actuation error: {0}")]
    Actuation(String),

    /// Expected/recoverable: a write collided with a uniqueness constraint
    /// (e.g. a medal tier already claimed). Surfaced to the caller, not
    /// logged as an error.
    #[error("Duplicate {0}")]
    Duplicate(DuplicateKind),

    /// The snapshot was implausibly small; the pass ran in degraded mode.
    #[error("Degraded snapshot: found {found} banners, minimum {minimum}")]
    DegradedSnapshot { found: usize, minimum: usize },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl Error {
    /// True when the error is an expected uniqueness collision rather than
    /// a real failure.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::Duplicate(_))
    }
}
