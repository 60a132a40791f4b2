//! Shared parser for `key value` style proc files such as `/proc/meminfo` or
//! the `btime` line of `/proc/stat`.
//!
//! Each line is split on whitespace; the first token is the key and the
//! second the value. Tokens after the value (e.g. the `kB` unit in
//! `/proc/meminfo`) are ignored, as are keys the implementor does not know.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use creo_probe::procfs::KeyValueStat;
//!
//! #[derive(Default)]
//! struct Swap {
//!     total_kb: u64,
//! }
//!
//! static HANDLERS: LazyLock<HashMap<&'static str, fn(&mut Swap, u64)>> = LazyLock::new(|| {
//!     let mut m: HashMap<&'static str, fn(&mut Swap, u64)> = HashMap::new();
//!     m.insert("SwapTotal:", |s, v| s.total_kb = v);
//!     m
//! });
//!
//! impl KeyValueStat for Swap {
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &HANDLERS
//!     }
//! }
//!
//! let swap = Swap::from_reader(&mut "SwapTotal:  2048 kB\n".as_bytes()).unwrap();
//! assert_eq!(swap.total_kb, 2048);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

pub trait KeyValueStat: Default + 'static {
    /// Known keys and the handler applying a parsed value to the struct.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Parses `key value` lines until every known key has been applied.
    ///
    /// # Errors
    ///
    /// Read failures are passed through; a known key with a non-numeric value or
    /// a known key given twice yields a wrapped [`StatParseError`].
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let handlers = Self::field_handlers();
        let mut stat = Self::default();
        let mut applied: HashSet<&'static str> = HashSet::with_capacity(handlers.len());

        for (idx, line) in buf.lines().enumerate() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            let (Some(key), Some(raw)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            let Some((&known, apply)) = handlers.get_key_value(key) else {
                continue;
            };

            let value = raw
                .parse::<u64>()
                .map_err(|source| StatParseError::BadKeyValue {
                    key: known.to_owned(),
                    value: raw.to_owned(),
                    line: idx + 1,
                    source,
                })?;
            if !applied.insert(known) {
                return Err(StatParseError::RepeatedKey {
                    key: known.to_owned(),
                    line: idx + 1,
                }
                .into());
            }
            apply(&mut stat, value);

            if applied.len() == handlers.len() {
                break;
            }
        }

        Ok(stat)
    }
}
