pub mod traits;
pub mod memory;
pub mod sqlite;

pub use traits::{CacheBackend, CacheRegion};
pub use memory::MemoryCache;
pub use sqlite::{SqliteCache, SqliteStorage};
