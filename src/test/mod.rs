//! Shared fixtures for the unit tests.
//!
//! The crate ships no sample binaries; every test image is produced by [`ImageBuilder`], which
//! the integration tests include from the same source file.


pub use builder::*;
