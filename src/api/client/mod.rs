//! Client module
//!
//! Clients for a planning session: over HTTP against a running server, or
//! in-process against a shared `Core`.

mod core;
mod http;
mod trait_def;

// Re-export the trait and types
pub use self::core::CoreClient;
pub use http::{ClientConfig, ClientError, HttpClientImpl};
pub use trait_def::Client;
