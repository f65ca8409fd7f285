use thiserror::Error;

/// Failures that abort a run with a non-zero exit.
#[derive(Debug, Error)]
pub enum VrError {
    #[error("revision source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("required configuration missing: {0}")]
    MissingConfig(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("players directory is locked by another run: {0}")]
    StoreLocked(String),
}

/// Recoverable conditions reported through `warn::emit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnCode {
    RevisionSkipped,
    FeedUnavailable,
    FeedShapeUnrecognized,
    FeedRowSkipped,
    DiscordUnavailable,
    StoreFileSkipped,
}

impl WarnCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RevisionSkipped => "REVISION_SKIPPED",
            Self::FeedUnavailable => "FEED_UNAVAILABLE",
            Self::FeedShapeUnrecognized => "FEED_SHAPE_UNRECOGNIZED",
            Self::FeedRowSkipped => "FEED_ROW_SKIPPED",
            Self::DiscordUnavailable => "DISCORD_UNAVAILABLE",
            Self::StoreFileSkipped => "STORE_FILE_SKIPPED",
        }
    }
}
