use bsky_client::BskyError;
use thiserror::Error;

/// Failures that leave a run with nothing to report. Everything else
/// (a single account's follows or profile failing) is recorded and skipped.
#[derive(Error, Debug)]
pub enum OrbitError {
    #[error("Invalid handle: {0:?}")]
    InvalidHandle(String),

    #[error("Could not find user @{handle}: {source}")]
    OriginNotFound {
        handle: String,
        #[source]
        source: BskyError,
    },

    #[error("@{handle} does not follow anyone")]
    NoFollows { handle: String },

    #[error("Could not fetch follows for @{handle}: {reason}")]
    FollowsUnavailable { handle: String, reason: String },

    #[error("Run cancelled before any follows of @{handle} were collected")]
    Cancelled { handle: String },
}
