//! Shared types for the deppo workspace.
//!
//! This crate holds the result envelopes returned by every repository
//! operation. An envelope records whether an operation succeeded, an
//! optional human-readable message, and (for [`DataResult`]) the payload.
//!
//! Envelopes serialize to the JSON shape HTTP clients of the backend
//! already consume:
//!
//! ```json
//! { "success": false, "message": "no such table: users", "data": null }
//! ```

mod result;

pub use result::{DataResult, OpResult};
