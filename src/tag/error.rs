use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    LoftyError(#[from] lofty::error::LoftyError),

    #[error("Tag task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type TagResult<T> = Result<T, TagError>;
