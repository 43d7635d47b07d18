//! Shared fixtures for the hdrkit integration tests and benchmarks.
//!
//! Everything here is built programmatically from the production crates,
//! except for [`fixtures::GZIP_HELLO`], which is the byte-exact output of
//! a reference gzip implementation.

#![allow(clippy::pedantic)]

pub mod fixtures;
