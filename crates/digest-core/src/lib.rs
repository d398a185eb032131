//! Shared types, configuration, and the top-level error for the news digest
//! workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::DigestConfig;
pub use error::{DigestError, Result};
pub use types::*;
