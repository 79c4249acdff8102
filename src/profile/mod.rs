//! Profile model: named bundles of header overrides plus domain and
//! method filters.

pub mod ops;
pub mod schema;

pub use ops::ProfileError;
pub use schema::{HeaderOverride, HttpMethod, Profile, ProfileStore};
