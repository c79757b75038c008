use crate::cue::error::CueError;
use crate::transcode::error::TranscodeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("CUE file not found: '{0}'")]
    CueNotFound(PathBuf),

    #[error("Audio file referenced by the CUE sheet not found: '{0}'")]
    MissingSource(PathBuf),

    #[error(transparent)]
    CueError(#[from] CueError),

    #[error(transparent)]
    TranscodeError(#[from] TranscodeError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

pub type SplitResult<T> = Result<T, SplitError>;
