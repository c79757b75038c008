use thiserror::Error;

#[derive(Debug, Error)]
pub enum CueError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Line {line}: malformed {directive} directive")]
    MalformedDirective { line: usize, directive: &'static str },

    #[error("Line {line}: invalid timecode '{value}'")]
    InvalidTimecode { line: usize, value: String },

    #[error("Line {line}: TRACK before any FILE")]
    TrackBeforeFile { line: usize },

    #[error("Line {line}: INDEX before any TRACK")]
    IndexBeforeTrack { line: usize },

    #[error("Line {line}: duplicate INDEX 01")]
    DuplicateStartIndex { line: usize },

    #[error("No FILE entries found in CUE sheet")]
    NoFiles,

    #[error("No TRACK entries found for file '{file}'")]
    NoTracks { file: String },

    #[error("Missing TITLE for track {number}")]
    MissingTitle { number: u32 },

    #[error("Missing INDEX 01 for track {number}")]
    MissingStartIndex { number: u32 },

    #[error("Duplicate track number {number} in file '{file}'")]
    DuplicateTrackNumber { number: u32, file: String },

    #[error("Track {number} in file '{file}' starts before its predecessor")]
    NonMonotonicStart { number: u32, file: String },
}

pub type CueResult<T> = Result<T, CueError>;
