//! Mock infrastructure for testing external services
//!
//! Provides a wiremock-based stand-in for the upstream provider APIs.

pub mod upstream;

pub use upstream::*;
