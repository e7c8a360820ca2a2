//! Data models for the harvester.

mod page;
mod record;
mod review_key;

pub use page::{PageFetchResult, PageStatus};
pub use record::{DocumentMetadata, ListingFragment, Record, Topic};
pub use review_key::CoreDocumentKey;
