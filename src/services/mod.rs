pub mod frontpage_service;

pub use frontpage_service::{FrontpageService, SourceUpdates};
