use thiserror::Error;

/// Conditions raised by the visualization core.
///
/// None of these are fatal: callers degrade the current frame and keep the
/// frame loop alive.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VizError {
    #[error("{0} requested before it was ready")]
    NotReady(&'static str),

    #[error("media element {attached} is attached; detach it before attaching {requested}")]
    AlreadyAttached { attached: u64, requested: u64 },

    #[error("malformed lyric line: {0:?}")]
    MalformedLyricLine(String),

    #[error("no drawing context available")]
    MissingDrawContext,

    #[error("no cover image loaded")]
    MissingCoverImage,

    #[error("invalid analyser setting: {0}")]
    InvalidAnalyser(String),

    #[error("invalid visual setting: {0}")]
    InvalidTunable(String),

    #[error("invalid color {0:?} (expected #rrggbb or r,g,b)")]
    InvalidColor(String),

    #[error("unknown algorithm {0:?}; valid: arc, arc-line, arc-line-dotted, bar")]
    UnknownAlgorithm(String),

    #[error("invalid media event {0:?}")]
    InvalidEvent(String),
}
