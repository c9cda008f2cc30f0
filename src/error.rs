use thiserror::Error;

/// Malformed inputs. Everything else in the pipeline resolves to a defined default.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("window size must be at least one game")]
    ZeroWindow,
    #[error("game log is not newest-first at index {index}")]
    UnsortedGameLog { index: usize },
    #[error("windowed metrics requested without a game log")]
    MissingGameLog,
}
