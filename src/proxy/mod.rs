//! Proxy module
//!
//! Handles request forwarding to upstream providers.

pub mod client;
pub mod engine;
pub mod headers;
pub mod logging;
pub mod route;

pub use client::{JsonCall, UpstreamClient};
pub use engine::{ForwardOptions, ProxyEngine};
pub use route::RouteConfig;
