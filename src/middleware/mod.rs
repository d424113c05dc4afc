//! Middleware module
//!
//! Contains the secret admission gate and the CORS policy layer.

pub mod cors;
pub mod secret;

pub use cors::{cors_middleware, CorsPolicy};
pub use secret::{secret_middleware, SecretGate};
