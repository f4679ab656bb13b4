//! Request-scoped data model.
//!
//! This module defines:
//! - File classification by extension
//! - The unified file record and its two mappers
//! - Tagged query outcomes
//! - Collection and search discriminators

mod category;
mod outcome;
mod record;
mod selector;

pub use category::{classify, classify_extension, extension_of, Category};
pub use outcome::{FailureKind, QueryOutcome, MEDIA_STORE_QUERY_ERROR};
pub use record::FileRecord;
pub use selector::{CollectionSelector, SearchFilter};

/// Emission type shared by every query stream.
pub type Listing = QueryOutcome<Vec<FileRecord>>;
