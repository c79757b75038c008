use crate::cue::error::{CueError, CueResult};
use crate::cue::models::{CueFile, CueSheet, CueTrack, Directive, FormatHint, Timecode};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub mod error;
pub mod models;

lazy_static! {
    static ref TIMECODE_RE: Regex = Regex::new(r"^(\d+):(\d{2}):(\d{2})$").unwrap();
}

pub struct CueParser {
    cue_path: PathBuf,
}

impl CueParser {
    pub fn new(cue_path: impl AsRef<Path>) -> Self {
        Self {
            cue_path: cue_path.as_ref().to_path_buf(),
        }
    }

    pub async fn parse(&self) -> CueResult<CueSheet> {
        let bytes = tokio::fs::read(&self.cue_path).await?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "CUE sheet {:?} is not valid UTF-8, decoding lossily",
                    self.cue_path
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };

        parse_sheet(&text)
    }
}

/// Parse raw sheet text into an ordered file/track model.
///
/// Line-oriented: every line tokenizes into one [`Directive`], unrecognized
/// directives are skipped, and `str::lines` plus trimming keeps CRLF and LF
/// sheets identical. A TRACK before any FILE, a malformed numeric field or a
/// malformed timecode aborts the parse; no partial sheet is returned.
pub fn parse_sheet(text: &str) -> CueResult<CueSheet> {
    let mut album_title: Option<String> = None;
    let mut album_performer: Option<String> = None;
    let mut files: Vec<CueFile> = Vec::new();
    let mut current_file: Option<PendingFile> = None;
    let mut current_track: Option<PendingTrack> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        match tokenize_line(line, line_no)? {
            Directive::Rem | Directive::Unrecognized => {}
            Directive::Title(value) => match current_track.as_mut() {
                Some(track) => track.title = Some(value),
                None => {
                    if album_title.is_none() {
                        album_title = Some(value);
                    }
                }
            },
            Directive::Performer(value) => match current_track.as_mut() {
                Some(track) => track.performer = Some(value),
                None => {
                    if album_performer.is_none() {
                        album_performer = Some(value);
                    }
                }
            },
            Directive::File { path, format_hint } => {
                flush_track(&mut current_file, current_track.take())?;
                if let Some(file) = current_file.take() {
                    files.push(file.finish()?);
                }
                current_file = Some(PendingFile {
                    path,
                    format_hint,
                    tracks: Vec::new(),
                });
            }
            Directive::Track { number } => {
                if current_file.is_none() {
                    return Err(CueError::TrackBeforeFile { line: line_no });
                }
                flush_track(&mut current_file, current_track.take())?;
                current_track = Some(PendingTrack::new(number));
            }
            Directive::Index { number, position } => {
                let Some(track) = current_track.as_mut() else {
                    return Err(CueError::IndexBeforeTrack { line: line_no });
                };
                match number {
                    1 => {
                        if track.start.is_some() {
                            return Err(CueError::DuplicateStartIndex { line: line_no });
                        }
                        track.start = Some(position);
                    }
                    0 => track.pregap = Some(position),
                    // Higher index points are informational, like the pre-gap.
                    _ => {}
                }
            }
        }
    }

    flush_track(&mut current_file, current_track.take())?;
    if let Some(file) = current_file.take() {
        files.push(file.finish()?);
    }

    if files.is_empty() {
        return Err(CueError::NoFiles);
    }

    Ok(CueSheet {
        album_title,
        album_performer,
        files,
    })
}

#[derive(Debug)]
struct PendingFile {
    path: String,
    format_hint: FormatHint,
    tracks: Vec<CueTrack>,
}

impl PendingFile {
    fn finish(self) -> CueResult<CueFile> {
        if self.tracks.is_empty() {
            return Err(CueError::NoTracks { file: self.path });
        }

        let mut numbers: HashSet<u32> = HashSet::new();
        for track in &self.tracks {
            if !numbers.insert(track.number) {
                return Err(CueError::DuplicateTrackNumber {
                    number: track.number,
                    file: self.path,
                });
            }
        }

        for pair in self.tracks.windows(2) {
            if pair[1].start < pair[0].start {
                return Err(CueError::NonMonotonicStart {
                    number: pair[1].number,
                    file: self.path,
                });
            }
        }

        Ok(CueFile {
            path: self.path,
            format_hint: self.format_hint,
            tracks: self.tracks,
        })
    }
}

#[derive(Debug)]
struct PendingTrack {
    number: u32,
    title: Option<String>,
    performer: Option<String>,
    start: Option<Timecode>,
    pregap: Option<Timecode>,
}

impl PendingTrack {
    fn new(number: u32) -> Self {
        Self {
            number,
            title: None,
            performer: None,
            start: None,
            pregap: None,
        }
    }

    fn finish(self) -> CueResult<CueTrack> {
        let title = self.title.ok_or(CueError::MissingTitle {
            number: self.number,
        })?;
        let start = self.start.ok_or(CueError::MissingStartIndex {
            number: self.number,
        })?;

        Ok(CueTrack {
            number: self.number,
            title,
            performer: self.performer,
            start,
            pregap: self.pregap,
        })
    }
}

fn flush_track(
    file: &mut Option<PendingFile>,
    track: Option<PendingTrack>,
) -> CueResult<()> {
    if let (Some(file), Some(track)) = (file.as_mut(), track) {
        file.tracks.push(track.finish()?);
    }
    Ok(())
}

fn tokenize_line(line: &str, line_no: usize) -> CueResult<Directive> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(keyword) = tokens.first() else {
        return Ok(Directive::Unrecognized);
    };

    match keyword.to_ascii_uppercase().as_str() {
        "REM" => Ok(Directive::Rem),
        "TITLE" => Ok(Directive::Title(text_argument(line, "TITLE", line_no)?)),
        "PERFORMER" => Ok(Directive::Performer(text_argument(
            line, "PERFORMER", line_no,
        )?)),
        "FILE" => {
            let (path, format_token) = if line.contains('"') {
                let (path, rest) = quoted_argument(line, "FILE", line_no)?;
                (path, rest.split_whitespace().next().unwrap_or("").to_string())
            } else {
                if tokens.len() < 2 {
                    return Err(CueError::MalformedDirective {
                        line: line_no,
                        directive: "FILE",
                    });
                }
                let format_token = tokens.get(2).copied().unwrap_or("");
                (tokens[1].to_string(), format_token.to_string())
            };

            if path.is_empty() {
                return Err(CueError::MalformedDirective {
                    line: line_no,
                    directive: "FILE",
                });
            }

            Ok(Directive::File {
                path,
                format_hint: FormatHint::from_token(&format_token),
            })
        }
        "TRACK" => {
            let number = tokens
                .get(1)
                .and_then(|token| token.parse::<u32>().ok())
                .ok_or(CueError::MalformedDirective {
                    line: line_no,
                    directive: "TRACK",
                })?;

            Ok(Directive::Track { number })
        }
        "INDEX" => {
            if tokens.len() < 3 {
                return Err(CueError::MalformedDirective {
                    line: line_no,
                    directive: "INDEX",
                });
            }
            let number = tokens[1]
                .parse::<u8>()
                .map_err(|_| CueError::MalformedDirective {
                    line: line_no,
                    directive: "INDEX",
                })?;
            let position = parse_timecode(tokens[2], line_no)?;

            Ok(Directive::Index { number, position })
        }
        _ => Ok(Directive::Unrecognized),
    }
}

/// Extract a quoted argument by matching the first and last `"` on the line,
/// so embedded apostrophes and quotes survive verbatim. Returns the argument
/// and the remainder of the line after the closing quote.
fn quoted_argument<'a>(
    line: &'a str,
    directive: &'static str,
    line_no: usize,
) -> CueResult<(String, &'a str)> {
    let malformed = || CueError::MalformedDirective {
        line: line_no,
        directive,
    };

    let start = line.find('"').ok_or_else(malformed)?;
    let end = line.rfind('"').ok_or_else(malformed)?;
    if start >= end {
        return Err(malformed());
    }

    Ok((line[start + 1..end].to_string(), &line[end + 1..]))
}

/// TITLE/PERFORMER argument: quoted when quotes are present, otherwise the
/// raw remainder of the line.
fn text_argument(line: &str, directive: &'static str, line_no: usize) -> CueResult<String> {
    if line.contains('"') {
        return Ok(quoted_argument(line, directive, line_no)?.0);
    }

    let rest = line
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("");
    if rest.is_empty() {
        return Err(CueError::MalformedDirective {
            line: line_no,
            directive,
        });
    }

    Ok(rest.to_string())
}

fn parse_timecode(value: &str, line_no: usize) -> CueResult<Timecode> {
    let invalid = || CueError::InvalidTimecode {
        line: line_no,
        value: value.to_string(),
    };

    let captures = TIMECODE_RE.captures(value).ok_or_else(invalid)?;
    let minutes: u32 = captures[1].parse().map_err(|_| invalid())?;
    let seconds: u8 = captures[2].parse().map_err(|_| invalid())?;
    let frames: u8 = captures[3].parse().map_err(|_| invalid())?;
    if seconds >= 60 || frames >= 75 {
        return Err(invalid());
    }

    Ok(Timecode {
        minutes,
        seconds,
        frames,
    })
}
