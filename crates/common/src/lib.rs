//! Shared types for the fetchkit workspace
//!
//! Configuration errors used by every crate that loads TOML, and the
//! `Secret` wrapper that keeps bearer tokens out of logs.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
