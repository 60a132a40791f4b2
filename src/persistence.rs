mod error;
mod memory;
mod mysql;
mod sink;

pub use error::{Error, Result};
pub use memory::{MemoryStore, Operation};
pub use mysql::MySqlStore;
pub use sink::{Filter, SampleReader, StorageSink};
