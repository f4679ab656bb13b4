//! Filescope Library
//!
//! Live, cancellable queries over a device's local storage: folder listings,
//! recursive name search and media-catalog collections, each re-emitted
//! whenever the underlying filesystem or catalog changes.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod query;
pub mod repository;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{Category, CollectionSelector, FileRecord, Listing, QueryOutcome, SearchFilter};
pub use query::QueryStream;
pub use repository::StorageRepository;
