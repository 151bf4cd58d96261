use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The word list could not be read. Fatal at startup.
    #[error("word list {} is unavailable: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("need {needed} distinct words but the pool only has {available}")]
    InsufficientWords { needed: usize, available: usize },
    /// Every word has been drawn. Ends the session without a winner.
    #[error("no undrawn words remain")]
    Exhausted,
    #[error("a grid of size {size} needs {expected} words, got {got}")]
    GridShape { size: usize, expected: usize, got: usize },
    #[error("grid size must be at least 1")]
    ZeroGridSize,
}
