#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Procfs(#[from] crate::procfs::Error),
    #[error(transparent)]
    Docker(#[from] crate::docker::Error),
    #[error("{0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
