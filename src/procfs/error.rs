use std::num::ParseIntError;
use std::path::PathBuf;

/// Errors raised while reading host metrics from the proc filesystem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open file `{path}`: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to stat filesystem at `{path}`: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing field `{field}` in `{path}`")]
    MissingField { path: PathBuf, field: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A proc file whose content does not have the expected shape.
///
/// Parsers return it inside an [`std::io::Error`] of kind `InvalidData`.
#[derive(Debug, thiserror::Error)]
pub enum StatParseError {
    #[error("key `{key}` repeated on line {line}")]
    RepeatedKey { key: String, line: usize },
    #[error("line {line}: `{key}` has non-numeric value `{value}`: {source}")]
    BadKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
    #[error("line {line}: counter `{value}` is not a number: {source}")]
    BadCounter {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        Self::new(std::io::ErrorKind::InvalidData, err)
    }
}

#[cfg(test)]
pub(super) fn parse_error_of(err: &std::io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<StatParseError>())
        .expect("io::Error wraps a StatParseError")
}
