mod connection;
mod cache_repository;

pub use connection::SqliteStorage;
pub use cache_repository::SqliteCache;
