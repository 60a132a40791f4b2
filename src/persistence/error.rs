use crate::sample::MetricClass;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("failed to insert samples: {0}")]
    Insert(#[source] sqlx::Error),
    #[error("failed to delete samples: {0}")]
    Delete(#[source] sqlx::Error),
    #[error("failed to read samples: {0}")]
    Read(#[source] sqlx::Error),
    #[error("cannot write {found} samples into {expected} table")]
    ClassMismatch {
        expected: MetricClass,
        found: MetricClass,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
