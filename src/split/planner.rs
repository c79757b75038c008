use crate::cue::models::{CueSheet, CueTrack, Timecode};
use crate::split::SplitContext;
use crate::transcode::TranscodeMode;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;

lazy_static! {
    static ref RESERVED_RE: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
}

/// One planned extraction: everything the executor needs to cut a single
/// track out of its source file. Created once per track, consumed once.
#[derive(Debug, Clone)]
pub struct SplitJob {
    /// Position in the sheet's declared track order, used to present the
    /// final report deterministically regardless of execution order.
    pub sequence: usize,
    pub source: PathBuf,
    pub start: Timecode,
    /// `None` means the track runs to the end of its source file. Boundaries
    /// never cross into the next FILE entry.
    pub end: Option<Timecode>,
    pub start_sample: u64,
    pub end_sample: Option<u64>,
    pub sample_rate: u32,
    pub output: PathBuf,
    pub tags: BTreeMap<String, String>,
    pub mode: TranscodeMode,
}

impl SplitJob {
    pub fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Derive the ordered job list for a parsed sheet.
///
/// `sample_rates` holds one probed rate per `CueFile`, in sheet order. Pure
/// transform otherwise: no filesystem access happens here.
pub fn plan_jobs(sheet: &CueSheet, ctx: &SplitContext, sample_rates: &[u32]) -> Vec<SplitJob> {
    let mut jobs = Vec::new();
    let mut sequence = 0;

    for (file_index, file) in sheet.files.iter().enumerate() {
        let sample_rate = sample_rates[file_index];
        let source = file.resolved_path(&ctx.sheet_dir);
        let mode = if file.is_wav() {
            // WAV sides have no FLAC frames to copy.
            TranscodeMode::ReEncode
        } else {
            ctx.config.mode
        };

        for (track_index, track) in file.tracks.iter().enumerate() {
            let end = file.tracks.get(track_index + 1).map(|next| next.start);

            jobs.push(SplitJob {
                sequence,
                source: source.clone(),
                start: track.start,
                end,
                start_sample: track.start.to_sample_offset(sample_rate),
                end_sample: end.map(|end| end.to_sample_offset(sample_rate)),
                sample_rate,
                output: ctx.sheet_dir.join(track_filename(file_index + 1, track)),
                tags: track_tags(sheet, track),
                mode,
            });
            sequence += 1;
        }
    }

    jobs
}

/// Output filename for a track: `{fileOrdinal:02}-{trackNumber:02} - {title}.flac`.
///
/// The two-part prefix keys on the owning file's position in the sheet, so
/// sides that restart their numbering at 1 can never collide.
pub fn track_filename(file_ordinal: usize, track: &CueTrack) -> String {
    format!(
        "{:02}-{:02} - {}.flac",
        file_ordinal,
        track.number,
        sanitize_title(&track.title)
    )
}

/// Replace filesystem-reserved characters for use in output names.
///
/// The table is fixed: `< > : " / \ | ? *` each become `_`, the sequence
/// `..` becomes `__`, surrounding whitespace is trimmed and an empty result
/// becomes `untitled`. Tag values keep the verbatim title.
pub fn sanitize_title(title: &str) -> String {
    let cleaned = RESERVED_RE.replace_all(title, "_");
    let cleaned = cleaned.replace("..", "__");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

fn track_tags(sheet: &CueSheet, track: &CueTrack) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert("TRACKNUMBER".to_string(), track.number.to_string());
    tags.insert("TITLE".to_string(), track.title.clone());

    if let Some(album) = &sheet.album_title {
        tags.insert("ALBUM".to_string(), album.clone());
    }
    if let Some(performer) = track.performer.as_ref().or(sheet.album_performer.as_ref()) {
        tags.insert("ARTIST".to_string(), performer.clone());
        tags.insert("ALBUMARTIST".to_string(), performer.clone());
    }

    tags
}
