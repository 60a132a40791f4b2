#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{0}` must be set")]
    Missing(&'static str),
    #[error("invalid value `{value}` for `{var}`: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
