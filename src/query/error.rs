use crate::sample::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid range: start {from} is after end {to}")]
    InvalidRange { from: Timestamp, to: Timestamp },
    #[error(transparent)]
    Storage(#[from] crate::persistence::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
