use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),

    #[error("Could not probe '{path}': {detail}")]
    ProbeFailed { path: PathBuf, detail: String },

    #[error("Output file already exists: '{0}'")]
    OutputExists(PathBuf),

    #[error("ffmpeg exited with {status}: {stderr}")]
    FfmpegFailed { status: ExitStatus, stderr: String },

    #[error("Produced file '{path}' is not a valid FLAC stream: {detail}")]
    CorruptOutput { path: PathBuf, detail: String },

    #[error("Transcode task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type TranscodeResult<T> = Result<T, TranscodeError>;
