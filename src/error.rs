use std::fmt::Display;

pub trait ResultOkLogExt<T, E> {
    /// Converts into an `Option`, logging the error together with `context`.
    fn ok_log(self, context: impl Display) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, context: impl Display) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{}: error={}", context, err);
                None
            }
        }
    }
}
