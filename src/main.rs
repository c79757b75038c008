use crate::commands::{Cli, Commands};
use crate::split::SplitConfig;
use crate::transcode::TranscodeMode;
use anyhow::{Result, bail};
use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

mod commands;
mod cue;
mod split;
mod tag;
mod transcode;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let logger = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .build();

    let level = logger.filter();
    let pb = MultiProgress::new();

    LogWrapper::new(pb.clone(), logger).try_init()?;
    log::set_max_level(level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Split(cmd) => {
            let config = SplitConfig {
                tagging: !cmd.no_tagging,
                mode: if cmd.stream_copy {
                    TranscodeMode::StreamCopy
                } else {
                    TranscodeMode::ReEncode
                },
                on_exists: cmd.on_exists,
                concurrency: cmd.concurrency.get(),
            };

            let report = split::split_cue(pb.clone(), &cmd.cue, config).await?;
            if !report.is_success() {
                bail!(
                    "{} of {} track(s) were not written",
                    report.failed(),
                    report.total()
                );
            }
        }
    }

    Ok(())
}
