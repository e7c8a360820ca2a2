//! review-harvester - systematic review metadata harvester.
//!
//! Walks a topic's paginated search listing, pulls bibliographic metadata
//! from each review page, and writes pipe-delimited records. When the
//! listing is behind an anti-bot challenge, falls back to the Crossref
//! works API and rebuilds the same record shape from its JSON.

pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod output;
pub mod scrapers;
pub mod topics;
pub mod utils;

pub use error::{HarvestError, Result};
