pub mod traits;
pub mod markup;
pub mod http;
pub mod vcs;
pub mod feed;
pub mod git;
pub mod source;
pub mod registry;

pub use traits::{CachedSource, SourceSettings};
pub use feed::FeedSource;
pub use git::{GitSource, LinkTargets, Repository};
pub use http::{FeedFetcher, HttpFeedFetcher};
pub use vcs::{GitCli, GitCommands, RawCommit};
pub use source::Source;
pub use registry::SourceRegistry;
