use std::path::{Path, PathBuf};

/// One parsed CUE sheet. File order matches the order of appearance in the
/// sheet text; album-level metadata applies to every track that does not
/// override it.
#[derive(Debug, Clone)]
pub struct CueSheet {
    pub album_title: Option<String>,
    pub album_performer: Option<String>,
    pub files: Vec<CueFile>,
}

/// One physical audio source (a FLAC or WAV "side") and the tracks it
/// contains.
#[derive(Debug, Clone)]
pub struct CueFile {
    /// Path exactly as written in the sheet, resolved against the sheet
    /// directory only when the planner needs to touch the filesystem.
    pub path: String,
    /// Declared type token of the FILE directive. Informational only; the
    /// actual format is decided by the resolved file itself.
    pub format_hint: FormatHint,
    pub tracks: Vec<CueTrack>,
}

impl CueFile {
    pub fn resolved_path(&self, sheet_dir: &Path) -> PathBuf {
        sheet_dir.join(&self.path)
    }

    /// WAV sides carry no FLAC frames, so they can never be stream-copied.
    pub fn is_wav(&self) -> bool {
        Path::new(&self.path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"))
    }
}

#[derive(Debug, Clone)]
pub struct CueTrack {
    /// Track number as declared in the sheet. 1-based and unique within its
    /// file, but may restart at 1 on the next FILE (per-side reset).
    pub number: u32,
    pub title: String,
    pub performer: Option<String>,
    /// INDEX 01, the only boundary used for splitting.
    pub start: Timecode,
    /// INDEX 00 when present. Recorded but never consulted by the planner.
    pub pregap: Option<Timecode>,
}

/// Declared type token of a FILE directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Wave,
    Flac,
    Other,
}

impl FormatHint {
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "WAVE" => Self::Wave,
            "FLAC" => Self::Flac,
            _ => Self::Other,
        }
    }
}

/// One tokenized sheet line. Directives the splitter does not act on are
/// carried as `Unrecognized` so the parser can skip them structurally
/// instead of failing on them.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Rem,
    Performer(String),
    Title(String),
    File { path: String, format_hint: FormatHint },
    Track { number: u32 },
    Index { number: u8, position: Timecode },
    Unrecognized,
}

/// CUE timecode: minutes, seconds and frames at 75 frames per second.
///
/// The derived ordering is lexicographic over (minutes, seconds, frames),
/// which is chronological order for valid timecodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timecode {
    pub minutes: u32,
    pub seconds: u8,
    pub frames: u8,
}

pub const FRAMES_PER_SECOND: u64 = 75;

impl Timecode {
    pub fn total_frames(&self) -> u64 {
        (u64::from(self.minutes) * 60 + u64::from(self.seconds)) * FRAMES_PER_SECOND
            + u64::from(self.frames)
    }

    /// Exact sample offset at the given rate. All arithmetic stays integral;
    /// truncation happens only at the final division so summed offsets never
    /// drift.
    pub fn to_sample_offset(&self, sample_rate: u32) -> u64 {
        self.total_frames() * u64::from(sample_rate) / FRAMES_PER_SECOND
    }

    /// Seconds with microsecond precision for transcoder seek arguments,
    /// rounded half-up at the last step.
    pub fn to_timestamp(&self) -> String {
        let numerator = self.total_frames() * 1_000_000;
        let micros = (numerator * 2 + FRAMES_PER_SECOND) / (FRAMES_PER_SECOND * 2);
        format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minutes, self.seconds, self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(minutes: u32, seconds: u8, frames: u8) -> Timecode {
        Timecode {
            minutes,
            seconds,
            frames,
        }
    }

    #[test]
    fn sample_offset_is_exact_at_cd_rate() {
        // 44100 / 75 = 588 samples per frame.
        assert_eq!(tc(0, 0, 0).to_sample_offset(44100), 0);
        assert_eq!(tc(0, 0, 1).to_sample_offset(44100), 588);
        assert_eq!(tc(0, 1, 0).to_sample_offset(44100), 44100);
        assert_eq!(tc(3, 41, 74).to_sample_offset(44100), 221 * 44100 + 74 * 588);
    }

    #[test]
    fn sample_offset_is_exact_at_48k() {
        // 48000 / 75 = 640 samples per frame.
        assert_eq!(tc(0, 0, 1).to_sample_offset(48000), 640);
        assert_eq!(tc(1, 0, 0).to_sample_offset(48000), 60 * 48000);
        assert_eq!(tc(12, 34, 56).to_sample_offset(48000), (754 * 75 + 56) * 640);
    }

    #[test]
    fn summed_offsets_do_not_drift() {
        // Accumulating per-frame offsets must land exactly on the offset of
        // the summed timecode.
        let rate = 44100;
        let per_frame = tc(0, 0, 1).to_sample_offset(rate);
        let total = tc(0, 2, 0).to_sample_offset(rate);
        assert_eq!(per_frame * 150, total);
    }

    #[test]
    fn timestamp_has_microsecond_precision() {
        assert_eq!(tc(0, 0, 0).to_timestamp(), "0.000000");
        assert_eq!(tc(0, 1, 0).to_timestamp(), "1.000000");
        // 1/75 s = 0.01333... rounded half-up at the sixth decimal.
        assert_eq!(tc(0, 0, 1).to_timestamp(), "0.013333");
        // 2/75 s = 0.02666...7
        assert_eq!(tc(0, 0, 2).to_timestamp(), "0.026667");
        assert_eq!(tc(2, 30, 0).to_timestamp(), "150.000000");
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(tc(0, 59, 74) < tc(1, 0, 0));
        assert!(tc(1, 0, 0) < tc(1, 0, 1));
        assert!(tc(0, 30, 10) == tc(0, 30, 10));
    }

    #[test]
    fn wav_detection_ignores_case_and_declared_hint() {
        let file = CueFile {
            path: "Side A.WAV".to_string(),
            format_hint: FormatHint::Flac,
            tracks: Vec::new(),
        };
        assert!(file.is_wav());

        let file = CueFile {
            path: "side_a.flac".to_string(),
            format_hint: FormatHint::Wave,
            tracks: Vec::new(),
        };
        assert!(!file.is_wav());
    }
}
