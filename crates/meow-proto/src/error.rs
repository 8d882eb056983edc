//! Error taxonomy shared by the CLI and the daemon.
//!
//! Fetch and parse failures are always caught by the caller and turned into a
//! fallback message.  Scheduling failures are logged and swallowed; the next
//! lifecycle event re-arms.  Missing notification permission is not an error
//! at all, see [`crate::notification::Permission`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("document has no root element")]
    NoRoot,
    #[error("feed contains no {expected} elements")]
    Empty { expected: &'static str },
    #[error("{element} #{index} is missing <{field}>")]
    MissingField {
        element: &'static str,
        index: usize,
        field: &'static str,
    },
}

/// Either half of loading a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("no scheduled-trigger mechanism is available")]
    Unsupported,
    #[error("fire time {0} is already in the past")]
    Elapsed(chrono::DateTime<chrono::Utc>),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} rejected the trigger: {stderr}")]
    Rejected { program: String, stderr: String },
    #[error("{program} did not finish within {after:?}")]
    TimedOut {
        program: String,
        after: std::time::Duration,
    },
    #[error("daemon event channel closed")]
    ChannelClosed,
}
