//! Mirroring of authenticated Apache auto-index trees.
//!
//! This module walks a remote directory listing recursively and reproduces it
//! under a local directory, resuming partially downloaded files.
//!
//! # Features
//!
//! - Child link discovery on loosely formed listing pages
//! - Same-host, below-the-directory recursion only
//! - Resume of partial files with `HEAD` + `Range` requests
//! - Up to 5 attempts per item with linear backoff (5s, 10s, 15s, 20s)
//! - Periodic heartbeats and progress snapshots while network work runs
//! - HTTP Basic credentials on every request
//!
//! # Example
//!
//! ```no_run
//! use apachedl_core::mirror::{ClientConfig, Mirror, MirrorClient, MirrorOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MirrorClient::new(&ClientConfig::default())?;
//! let mirror = Mirror::new(client, MirrorOptions::default());
//! let status = mirror
//!     .mirror_root("https://files.example/pub/", Path::new("."))
//!     .await?;
//! println!("pub: {status}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod links;
mod naming;
mod progress;
mod retry;
mod status;
mod transfer;
mod walker;

pub use client::{ClientConfig, Credentials, ListingPage, MirrorClient};
pub use error::MirrorError;
pub use links::{ListingError, extract_links, is_directory_url};
pub use naming::{clean_name, decode_component, directory_name, file_name, local_path};
pub use progress::{
    LogReporter, ProgressReporter, ProgressSnapshot, SnapshotSampler, SpinnerReporter,
    TransferProgress, supervise,
};
pub use retry::{Retried, RetryPolicy, status_for_http, status_for_transport};
pub use status::{Attempt, ResultStatus, TransferOutcome};
pub use transfer::TransferState;
pub use walker::{Mirror, MirrorOptions, MirrorStats};
