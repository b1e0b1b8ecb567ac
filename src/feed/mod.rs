//! Feed domain: categories, version tracking, parsing and aggregation.
//!
//! ```text
//! path -> FileClassifier -> FileCategory
//!            |                    |
//!            |        versioned?  +--> VersionSelector (latest wins)
//!            v
//!        parser::parse(Grammar) -> ResultRecord -> Aggregator -> Snapshot
//! ```

mod aggregator;
mod category;
mod error;
mod model;
pub mod parser;
mod version;

pub use aggregator::{Aggregator, MergeOutcome, Snapshot};
pub use category::{FileCategory, FileClassifier};
pub use error::{FeedError, FeedResult, ParseError};
pub use model::{Answer, CouncilResult, FeedRecord, RawFeed, ReferendumAnswer, ResultRecord};
pub use parser::Grammar;
pub use version::{VersionSelector, VersionedFile};
