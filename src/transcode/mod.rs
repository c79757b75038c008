use crate::split::planner::SplitJob;
use crate::transcode::error::{TranscodeError, TranscodeResult};
use clap::ValueEnum;
use log::debug;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::watch;

pub mod error;

/// How a segment is carried into its output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeMode {
    /// Copy the original FLAC frames bit-exactly. The output inherits the
    /// source STREAMINFO, so its MD5 signature, sample count and duration
    /// are wrong for the segment. Accepted and never silently fixed.
    StreamCopy,
    /// Decode and re-encode at maximum lossless compression, which yields a
    /// numerically correct STREAMINFO as a side effect.
    ReEncode,
}

/// Policy for an output path that already exists.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExists {
    Fail,
    Overwrite,
    Skip,
}

/// Audio stream properties reported by the probing tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub sample_rate: u32,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Written,
    Skipped,
    Cancelled,
}

/// Client for the external transcoder processes. The contract is
/// {source, start, end, output, mode} in, exit status and a produced file
/// out; nothing else about the tools leaks past this module.
pub struct FfmpegClient;

impl FfmpegClient {
    /// Checks both tools up front so a missing binary aborts the run before
    /// any job is attempted.
    pub async fn new() -> TranscodeResult<Self> {
        ensure_tool("ffmpeg").await?;
        ensure_tool("ffprobe").await?;

        Ok(Self)
    }

    pub async fn probe(&self, source: &Path) -> TranscodeResult<SourceInfo> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=sample_rate,duration",
                "-of",
                "default=noprint_wrappers=1",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(TranscodeError::ProbeFailed {
                path: source.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            TranscodeError::ProbeFailed {
                path: source.to_path_buf(),
                detail: "no audio stream properties reported".to_string(),
            }
        })
    }

    /// Run one job to completion, honoring the on-exists policy and the
    /// cancellation signal. On cancellation the child is killed and the
    /// partial output is deleted; completed outputs are never touched.
    pub async fn extract(
        &self,
        job: &SplitJob,
        on_exists: OnExists,
        cancel: watch::Receiver<bool>,
    ) -> TranscodeResult<JobOutcome> {
        if tokio::fs::try_exists(&job.output).await? {
            match on_exists {
                OnExists::Fail => return Err(TranscodeError::OutputExists(job.output.clone())),
                OnExists::Skip => return Ok(JobOutcome::Skipped),
                OnExists::Overwrite => tokio::fs::remove_file(&job.output).await?,
            }
        }

        debug!(
            "Extracting samples {}..{} of {:?} at {} Hz",
            job.start_sample,
            job.end_sample
                .map_or_else(|| "eof".to_string(), |sample| sample.to_string()),
            job.source,
            job.sample_rate
        );

        let args = extract_args(job);
        debug!("Spawning ffmpeg with args: {args:?}");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr = child.stderr.take();

        tokio::select! {
            joined = async {
                let mut captured = String::new();
                let (status, _) = tokio::join!(child.wait(), async {
                    if let Some(stderr) = stderr.as_mut() {
                        let _ = stderr.read_to_string(&mut captured).await;
                    }
                });
                status.map(|status| (status, captured))
            } => {
                let (status, captured) = joined?;
                if !status.success() {
                    return Err(TranscodeError::FfmpegFailed {
                        status,
                        stderr: captured.trim().to_string(),
                    });
                }
            }
            _ = cancelled(cancel) => {
                let _ = child.kill().await;
                let _ = tokio::fs::remove_file(&job.output).await;
                return Ok(JobOutcome::Cancelled);
            }
        }

        verify_output(&job.output).await?;

        Ok(JobOutcome::Written)
    }
}

fn parse_probe_output(stdout: &str) -> Option<SourceInfo> {
    let mut sample_rate = None;
    let mut duration_secs = None;

    for line in stdout.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "sample_rate" => sample_rate = value.parse::<u32>().ok(),
            "duration" => duration_secs = value.parse::<f64>().ok(),
            _ => {}
        }
    }

    Some(SourceInfo {
        sample_rate: sample_rate?,
        duration_secs,
    })
}

/// Resolves once cancellation is signalled. A dropped sender means the run
/// can no longer be cancelled, so the future stays pending forever.
pub async fn cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

async fn ensure_tool(name: &'static str) -> TranscodeResult<()> {
    let result = Command::new(name)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(TranscodeError::ToolNotFound(name))
        }
        Err(err) => Err(err.into()),
    }
}

/// Reject zero-length or undecodable outputs. Opening with claxon reads the
/// STREAMINFO header without decoding any audio.
async fn verify_output(path: &Path) -> TranscodeResult<()> {
    let len = tokio::fs::metadata(path).await?.len();
    if len == 0 {
        return Err(TranscodeError::CorruptOutput {
            path: path.to_path_buf(),
            detail: "file is empty".to_string(),
        });
    }

    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || match claxon::FlacReader::open(&owned) {
        Ok(_) => Ok(()),
        Err(err) => Err(TranscodeError::CorruptOutput {
            path: owned,
            detail: err.to_string(),
        }),
    })
    .await?
}

/// Argument vector for one extraction. Seek options come after the input so
/// boundaries are decode-accurate, and the encoder settings are fixed so the
/// same job always produces the same invocation.
fn extract_args(job: &SplitJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostdin".into(),
        "-i".into(),
        job.source.clone().into_os_string(),
        "-ss".into(),
        job.start.to_timestamp().into(),
    ];

    if let Some(end) = job.end {
        args.push("-to".into());
        args.push(end.to_timestamp().into());
    }

    match job.mode {
        TranscodeMode::StreamCopy => args.extend(["-c".into(), "copy".into()]),
        TranscodeMode::ReEncode => args.extend([
            "-c:a".into(),
            "flac".into(),
            "-compression_level".into(),
            "8".into(),
        ]),
    }

    args.push(job.output.clone().into_os_string());

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::models::Timecode;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn job(mode: TranscodeMode, end: Option<Timecode>) -> SplitJob {
        SplitJob {
            sequence: 0,
            source: PathBuf::from("/rip/SideA.flac"),
            start: Timecode {
                minutes: 1,
                seconds: 30,
                frames: 0,
            },
            end,
            start_sample: 90 * 44100,
            end_sample: end.map(|end| end.to_sample_offset(44100)),
            sample_rate: 44100,
            output: PathBuf::from("/rip/01-01 - Song.flac"),
            tags: BTreeMap::new(),
            mode,
        }
    }

    fn args_as_strings(job: &SplitJob) -> Vec<String> {
        extract_args(job)
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn stream_copy_args_copy_codec_streams() {
        let end = Timecode {
            minutes: 3,
            seconds: 0,
            frames: 30,
        };
        let args = args_as_strings(&job(TranscodeMode::StreamCopy, Some(end)));

        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-loglevel",
                "error",
                "-nostdin",
                "-i",
                "/rip/SideA.flac",
                "-ss",
                "90.000000",
                "-to",
                "180.400000",
                "-c",
                "copy",
                "/rip/01-01 - Song.flac",
            ]
        );
    }

    #[test]
    fn re_encode_args_use_maximum_flac_compression() {
        let args = args_as_strings(&job(TranscodeMode::ReEncode, None));

        assert!(args.contains(&"flac".to_string()));
        assert!(args.contains(&"-compression_level".to_string()));
        assert!(args.contains(&"8".to_string()));
        // No end boundary: the segment runs to end-of-stream.
        assert!(!args.contains(&"-to".to_string()));
    }

    #[test]
    fn identical_jobs_build_identical_invocations() {
        let a = job(TranscodeMode::ReEncode, None);
        let b = job(TranscodeMode::ReEncode, None);
        assert_eq!(extract_args(&a), extract_args(&b));
    }

    #[test]
    fn probe_output_parses_rate_and_duration() {
        let info = parse_probe_output("sample_rate=44100\nduration=1288.466667\n").unwrap();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.duration_secs, Some(1288.466667));
    }

    #[test]
    fn probe_output_tolerates_missing_duration() {
        let info = parse_probe_output("sample_rate=48000\nduration=N/A\n").unwrap();
        assert_eq!(info.sample_rate, 48000);
        assert_eq!(info.duration_secs, None);
    }

    #[test]
    fn probe_output_without_sample_rate_is_rejected() {
        assert!(parse_probe_output("duration=12.0\n").is_none());
        assert!(parse_probe_output("").is_none());
    }
}
