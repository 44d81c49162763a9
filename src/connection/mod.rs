//! Session lifecycle: configuration and the shared bucket handle.

pub mod config;
pub mod session;

pub use config::BucketConfig;
pub use session::BucketSession;
