//! Storage abstraction and implementations for milestone tracking.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! reference implementation that keeps two encodings of every history.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod consistency;

pub use trait_::{Storage, StorageError, Result};
pub use json_storage::JsonStorage;
pub use consistency::{ConsistencyReport, ConsistencyStatus, Encoding, compare};
