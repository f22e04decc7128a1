#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
//! Integration test crate for Iris.
//!
//! This crate exists solely for integration testing. It is `publish = false`
//! and has no library code — all tests live in `tests/`.
