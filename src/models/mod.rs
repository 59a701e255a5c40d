//! Data models for the upvote board.
//!
//! JSON field names are camelCase to match what browser clients read.

mod feature_request;
mod identity;
mod profile;

pub use feature_request::*;
pub use identity::*;
pub use profile::*;
