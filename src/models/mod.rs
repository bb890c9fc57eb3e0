//! Data models for the posts backend.

mod record;

pub use record::*;
