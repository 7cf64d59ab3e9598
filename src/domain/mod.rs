pub mod update;
pub mod source_type;

pub use update::{newest_first, Commit, FeedUpdate, RepoUpdate, Update};
pub use source_type::SourceType;
