//! Shared error plumbing and small utilities used across all tidings crates.

pub mod error;
pub mod time;

pub use error::FromMessage;
