//! Utility functions.

pub mod normalize;

pub use normalize::{
    canonicalize_document_url, collapse_whitespace, join_authors, normalize_date,
    sanitize_field, to_absolute_url,
};
