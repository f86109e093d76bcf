//! Defining routes and flattening them into a [`RouteTable`].
//!
//! # Path syntax
//! Route paths are split at `/` into segments:
//! - a fixed segment (`users`) matches exactly,
//! - `:key` matches any single segment and makes it available as the parameter `key`,
//! - `:key?` does the same, but the segment may be absent,
//! - `*` matches the rest of the path, available as the parameter [`WILDCARD_PARAM`].
//!
//! Matching is case sensitive and ignores a trailing `/`.

mod config;
pub use config::*;

mod pattern;
pub(crate) use pattern::Pattern;
pub use pattern::WILDCARD_PARAM;

mod record;
pub use record::*;

mod table;
pub use table::*;
