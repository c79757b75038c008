use crate::cue::CueParser;
use crate::split::error::{SplitError, SplitResult};
use crate::split::planner::{SplitJob, plan_jobs};
use crate::tag;
use crate::tag::error::TagError;
use crate::transcode::error::TranscodeError;
use crate::transcode::{FfmpegClient, JobOutcome, OnExists, TranscodeMode};
use futures::StreamExt;
use indicatif::{MultiProgress, ProgressBar};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;

pub mod error;
pub mod planner;

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub tagging: bool,
    pub mode: TranscodeMode,
    pub on_exists: OnExists,
    pub concurrency: usize,
}

/// Resolved run context threaded through planning and execution: the
/// directory holding the sheet (and the outputs) plus the configuration.
#[derive(Debug, Clone)]
pub struct SplitContext {
    pub sheet_dir: PathBuf,
    pub config: SplitConfig,
}

#[derive(Debug)]
pub enum TrackStatus {
    Written,
    /// Output already existed and the on-exists policy is `skip`.
    Skipped,
    Cancelled,
    TranscodeFailed(TranscodeError),
    /// The audio was produced but its tags could not be written. The file
    /// stays valid; this is a data-quality warning, not a failure.
    TagWriteFailed(TagError),
}

#[derive(Debug)]
pub struct TrackResult {
    pub sequence: usize,
    pub output_name: String,
    pub status: TrackStatus,
}

/// Consolidated outcome of one run, with results in sheet track order
/// regardless of the order jobs finished in.
#[derive(Debug)]
pub struct SplitReport {
    pub results: Vec<TrackResult>,
    pub tag_fields: BTreeSet<String>,
}

impl SplitReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn written(&self) -> usize {
        self.results
            .iter()
            .filter(|result| {
                matches!(
                    result.status,
                    TrackStatus::Written | TrackStatus::TagWriteFailed(_)
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|result| {
                matches!(
                    result.status,
                    TrackStatus::TranscodeFailed(_) | TrackStatus::Cancelled
                )
            })
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Split every FILE entry of the sheet into per-track FLAC files.
///
/// Parse and probe failures abort before any job runs; per-job failures are
/// isolated, the remaining jobs still execute, and everything is aggregated
/// into the returned report.
pub async fn split_cue(
    pb: MultiProgress,
    cue_path: &Path,
    config: SplitConfig,
) -> SplitResult<SplitReport> {
    if !tokio::fs::try_exists(cue_path).await? {
        return Err(SplitError::CueNotFound(cue_path.to_path_buf()));
    }

    let started = Instant::now();

    debug!("Parsing CUE file: {cue_path:?}");
    let sheet = CueParser::new(cue_path).parse().await?;

    let sheet_dir = cue_path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let ctx = SplitContext { sheet_dir, config };

    info!("Parsed CUE successfully.");
    info!("Found {} input file(s).", sheet.files.len());

    let client = FfmpegClient::new().await?;

    // Sample offsets depend on the probed rates, so every side is probed
    // before the first job is planned.
    let mut sample_rates = Vec::with_capacity(sheet.files.len());
    for file in &sheet.files {
        let source = file.resolved_path(&ctx.sheet_dir);
        if !tokio::fs::try_exists(&source).await? {
            return Err(SplitError::MissingSource(source));
        }

        let source_info = client.probe(&source).await?;
        debug!(
            "{source:?}: {} Hz, duration {:?}",
            source_info.sample_rate, source_info.duration_secs
        );
        sample_rates.push(source_info.sample_rate);
    }

    let jobs = plan_jobs(&sheet, &ctx, &sample_rates);
    let total = jobs.len();
    info!("Ready to split {total} audio track(s)...");

    let tag_fields: BTreeSet<String> = if ctx.config.tagging {
        jobs.iter()
            .flat_map(|job| job.tags.keys().cloned())
            .collect()
    } else {
        BTreeSet::new()
    };

    let progress = pb.add(ProgressBar::new(total as u64));

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, stopping in-flight jobs...");
            let _ = cancel_tx.send(true);
        }
    });

    let client_ref = &client;
    let ctx_ref = &ctx;
    let mut results: Vec<TrackResult> = futures::stream::iter(jobs.into_iter().map(|job| {
        let progress = progress.clone();
        let cancel = cancel_rx.clone();
        async move {
            let result = run_job(client_ref, ctx_ref, job, total, cancel).await;
            progress.inc(1);
            result
        }
    }))
    .buffer_unordered(ctx.config.concurrency.max(1))
    .collect()
    .await;

    progress.finish_and_clear();

    results.sort_by_key(|result| result.sequence);
    let report = SplitReport {
        results,
        tag_fields,
    };
    report_outcome(&report, started.elapsed().as_secs());

    Ok(report)
}

async fn run_job(
    client: &FfmpegClient,
    ctx: &SplitContext,
    job: SplitJob,
    total: usize,
    cancel: watch::Receiver<bool>,
) -> TrackResult {
    let output_name = job.output_name();

    if *cancel.borrow() {
        return TrackResult {
            sequence: job.sequence,
            output_name,
            status: TrackStatus::Cancelled,
        };
    }

    info!("Task {} of {total}: {output_name}", job.sequence + 1);

    let status = match client.extract(&job, ctx.config.on_exists, cancel).await {
        Ok(JobOutcome::Written) => {
            if ctx.config.tagging {
                match tag::write_tags(&job.output, &job.tags).await {
                    Ok(()) => TrackStatus::Written,
                    Err(err) => TrackStatus::TagWriteFailed(err),
                }
            } else {
                TrackStatus::Written
            }
        }
        Ok(JobOutcome::Skipped) => {
            info!("Skipping existing output: {output_name}");
            TrackStatus::Skipped
        }
        Ok(JobOutcome::Cancelled) => TrackStatus::Cancelled,
        Err(err) => TrackStatus::TranscodeFailed(err),
    };

    TrackResult {
        sequence: job.sequence,
        output_name,
        status,
    }
}

fn report_outcome(report: &SplitReport, elapsed_secs: u64) {
    info!(
        "Wrote {} of {} track file(s).",
        report.written(),
        report.total()
    );
    info!("Time elapsed: {elapsed_secs} seconds");

    if report.tag_fields.is_empty() {
        info!("No tags added to the output files.");
    } else {
        let fields: Vec<&str> = report.tag_fields.iter().map(String::as_str).collect();
        info!(
            "Tags {} (present in CUE) added to output FLAC files.",
            fields.join(", ")
        );
    }

    for result in &report.results {
        match &result.status {
            TrackStatus::TranscodeFailed(err) => error!("{}: {err}", result.output_name),
            TrackStatus::TagWriteFailed(err) => warn!(
                "{}: audio written, but tagging failed: {err}",
                result.output_name
            ),
            TrackStatus::Cancelled => warn!("{}: cancelled", result.output_name),
            TrackStatus::Written | TrackStatus::Skipped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(sequence: usize, status: TrackStatus) -> TrackResult {
        TrackResult {
            sequence,
            output_name: format!("{:02}-{:02} - Track.flac", 1, sequence + 1),
            status,
        }
    }

    fn transcode_failure() -> TrackStatus {
        TrackStatus::TranscodeFailed(TranscodeError::OutputExists(PathBuf::from(
            "01-01 - Track.flac",
        )))
    }

    #[test]
    fn report_counts_written_and_failed_tracks() {
        let report = SplitReport {
            results: vec![
                result(0, TrackStatus::Written),
                result(1, transcode_failure()),
                result(2, TrackStatus::Written),
                result(3, TrackStatus::Skipped),
            ],
            tag_fields: BTreeSet::new(),
        };

        assert_eq!(report.total(), 4);
        assert_eq!(report.written(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn one_failed_job_does_not_taint_siblings() {
        let report = SplitReport {
            results: vec![
                result(0, TrackStatus::Written),
                result(1, transcode_failure()),
                result(2, TrackStatus::Written),
            ],
            tag_fields: BTreeSet::new(),
        };

        // Exactly one failure entry; the sibling results stand on their own.
        assert_eq!(report.failed(), 1);
        assert_eq!(report.written(), 2);
    }

    #[test]
    fn tag_write_failures_are_warnings_not_failures() {
        let report = SplitReport {
            results: vec![result(
                0,
                TrackStatus::TagWriteFailed(TagError::IoError(std::io::Error::other("boom"))),
            )],
            tag_fields: BTreeSet::new(),
        };

        assert!(report.is_success());
        assert_eq!(report.written(), 1);
    }

    #[test]
    fn cancelled_tracks_fail_the_run() {
        let report = SplitReport {
            results: vec![
                result(0, TrackStatus::Written),
                result(1, TrackStatus::Cancelled),
            ],
            tag_fields: BTreeSet::new(),
        };

        assert!(!report.is_success());
    }
}
