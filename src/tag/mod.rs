use crate::tag::error::TagResult;
use lofty::config::WriteOptions;
use lofty::ogg::VorbisComments;
use lofty::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

pub mod error;

/// Write a job's tag set into a produced FLAC as Vorbis comments.
///
/// Replaces the file's comment block without touching the audio stream. The
/// transcode step writes no tags of its own, so skipping this call leaves
/// the output with container defaults only.
pub async fn write_tags(path: &Path, tags: &BTreeMap<String, String>) -> TagResult<()> {
    let path = path.to_path_buf();
    let tags = tags.clone();

    tokio::task::spawn_blocking(move || {
        let mut comments = VorbisComments::default();
        for (key, value) in &tags {
            comments.push(key.clone(), value.clone());
        }
        comments.save_to_path(&path, WriteOptions::default())?;

        Ok(())
    })
    .await?
}
