//! apachedl core library
//!
//! Mirrors directory trees served by Apache `mod_autoindex` behind HTTP Basic
//! authentication into a local directory, resuming interrupted downloads.
//!
//! # Architecture
//!
//! - [`mirror`] - link extraction, retry driver, resumable transfer,
//!   directory walker and progress coordination

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod mirror;
mod user_agent;

// Re-export commonly used types
pub use mirror::{
    ClientConfig, Credentials, Mirror, MirrorClient, MirrorError, MirrorOptions, MirrorStats,
    ResultStatus, RetryPolicy,
};
