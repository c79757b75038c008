use crate::transcode::OnExists;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Split the FILE entries of a CUE sheet into per-track FLAC files.
#[derive(Parser, Debug, Clone)]
#[command(
    long_about = "Split the FILE entries of a CUE sheet into per-track FLAC files\n\nOutputs are written next to the CUE as 'NN-NN - Track Title.flac', keyed by file ordinal and declared track number. Only INDEX 01 entries are used as boundaries.\n\nBy default segments are re-encoded at FLAC compression level 8, which also yields correct STREAMINFO. With --stream-copy the original FLAC frames are kept bit-exactly, but the outputs inherit the source STREAMINFO (MD5, sample count, duration), which will be wrong for the segment. WAV inputs are always re-encoded."
)]
pub struct SplitCommand {
    /// Path to the .cue sheet; referenced audio files are resolved and
    /// outputs written next to it
    #[arg(value_name = "CUE")]
    pub cue: PathBuf,

    /// Disable writing tags derived from the CUE sheet
    #[arg(long, short = 'n', default_value_t = false)]
    pub no_tagging: bool,

    /// Keep original FLAC frames instead of re-encoding (STREAMINFO of the
    /// outputs stays that of the source and will be wrong for the segment)
    #[arg(long, short = 's', default_value_t = false)]
    pub stream_copy: bool,

    /// What to do when an output file already exists
    #[arg(long, value_enum, default_value_t = OnExists::Fail)]
    pub on_exists: OnExists,

    /// Maximum number of concurrent transcoder processes
    #[arg(long, short = 'j', default_value_t = default_concurrency())]
    pub concurrency: NonZeroUsize,
}

fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
