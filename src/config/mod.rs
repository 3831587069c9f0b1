//! Run configuration.
//!
//! The command line is the only run configuration surface; this module
//! validates it into a [`RunRequest`](crate::RunRequest) and resolves the
//! external tool locations.

mod builder;
mod error;
mod toolchain;

pub use builder::RunRequestBuilder;
pub use error::ConfigError;
pub use toolchain::{ENV_PREFIX, Tool, Toolchain};
