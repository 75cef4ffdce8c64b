//! Scoring and collection services.

pub mod feeds;
pub mod matcher;
pub mod registry;
pub mod scorer;
pub mod signals;

pub use feeds::{CollectOutcome, FeedCollector};
pub use matcher::{CategoryMatch, CategoryMatcher};
pub use registry::SourceRegistry;
pub use scorer::Scorer;
pub use signals::SignalDetector;
