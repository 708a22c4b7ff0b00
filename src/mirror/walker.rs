//! Recursive directory walker.
//!
//! [`Mirror`] fetches a listing page, creates the matching local directory and
//! visits every child link in page order: directories recurse, files go to the
//! resumable transfer, each under the retry driver. A directory's whole subtree
//! finishes before its next sibling starts.
//!
//! The local directory a call works in is passed down explicitly; the process
//! working directory is never touched.
//!
//! # Failure containment
//!
//! A child that ends in `Error` (or still `Retry` after the budget) is counted
//! and the walk moves on to its next sibling. Only a [`MirrorError`] (an
//! unusable local destination) stops the run.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use super::client::MirrorClient;
use super::constants::{LISTING_HEARTBEAT, PLAIN_LISTING_QUERY, TRANSFER_REPORT_INTERVAL};
use super::error::MirrorError;
use super::links::{extract_links, is_directory_url};
use super::naming::{directory_name, file_name, local_path};
use super::progress::{LogReporter, ProgressReporter, TransferProgress, supervise};
use super::retry::{RetryPolicy, status_for_http, status_for_transport};
use super::status::{ResultStatus, TransferOutcome};
use super::transfer::{TransferJob, run_supervised};

/// Behaviour switches for a mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Skip any file that already exists locally, without a network request.
    pub skip_existing: bool,
    /// Query appended to listing requests (`F=0` asks Apache for the plain list).
    pub listing_query: Option<String>,
    /// Heartbeat cadence while a listing page is in flight.
    pub listing_heartbeat: Duration,
    /// Snapshot cadence while a file is streaming.
    pub transfer_report_interval: Duration,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            skip_existing: false,
            listing_query: Some(PLAIN_LISTING_QUERY.to_string()),
            listing_heartbeat: LISTING_HEARTBEAT,
            transfer_report_interval: TRANSFER_REPORT_INTERVAL,
        }
    }
}

/// Counters for a mirror run.
#[derive(Debug, Default)]
pub struct MirrorStats {
    directories: AtomicUsize,
    files_completed: AtomicUsize,
    files_skipped: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    bytes: AtomicU64,
}

impl MirrorStats {
    /// Directories whose listing was processed successfully.
    #[must_use]
    pub fn directories(&self) -> usize {
        self.directories.load(Ordering::SeqCst)
    }

    /// Files downloaded or resumed to completion.
    #[must_use]
    pub fn files_completed(&self) -> usize {
        self.files_completed.load(Ordering::SeqCst)
    }

    /// Files skipped as existing or already complete.
    #[must_use]
    pub fn files_skipped(&self) -> usize {
        self.files_skipped.load(Ordering::SeqCst)
    }

    /// Directories and files that ended in `Error` or exhausted their retries.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Extra attempts made beyond the first.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Bytes written to disk across all attempts.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    fn record_attempts(&self, attempts: u32) {
        let extra = usize::try_from(attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        self.retried.fetch_add(extra, Ordering::SeqCst);
    }

    fn record_directory(&self, status: ResultStatus) {
        match status {
            ResultStatus::Success | ResultStatus::Skip => {
                self.directories.fetch_add(1, Ordering::SeqCst);
            }
            ResultStatus::Retry | ResultStatus::Error => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn record_file(&self, status: ResultStatus) {
        let counter = match status {
            ResultStatus::Success => &self.files_completed,
            ResultStatus::Skip => &self.files_skipped,
            ResultStatus::Retry | ResultStatus::Error => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn add_bytes(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }
}

/// Listing fetch result, reduced to a page or a terminal status.
enum Listing {
    Page(String),
    Failed(ResultStatus),
}

/// Mirrors remote directory trees and files into a local directory.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use apachedl_core::mirror::{ClientConfig, Credentials, Mirror, MirrorClient, MirrorOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MirrorClient::new(&ClientConfig {
///     credentials: Some(Credentials::new("alice", "s3cret")),
///     ..ClientConfig::default()
/// })?;
/// let mirror = Mirror::new(client, MirrorOptions::default());
/// mirror
///     .mirror_all(&["https://files.example/pub/".to_string()], Path::new("./mirror"))
///     .await?;
/// println!("{} files completed", mirror.stats().files_completed());
/// # Ok(())
/// # }
/// ```
pub struct Mirror {
    client: MirrorClient,
    options: MirrorOptions,
    retry_policy: RetryPolicy,
    reporter: Arc<dyn ProgressReporter>,
    stats: MirrorStats,
}

impl fmt::Debug for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mirror")
            .field("client", &self.client)
            .field("options", &self.options)
            .field("retry_policy", &self.retry_policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Mirror {
    /// Creates a mirror with the default retry policy and log-based progress.
    #[must_use]
    pub fn new(client: MirrorClient, options: MirrorOptions) -> Self {
        Self {
            client,
            options,
            retry_policy: RetryPolicy::default(),
            reporter: Arc::new(LogReporter),
            stats: MirrorStats::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> &MirrorStats {
        &self.stats
    }

    /// Mirrors every root URL, in order, into `target`.
    ///
    /// `target` is created when missing. Roots ending in `/` are walked as
    /// directories; any other root is transferred as a single file.
    ///
    /// # Errors
    ///
    /// Returns a [`MirrorError`] when the local destination is unusable.
    /// Remote failures never surface here; they are counted in [`Self::stats`].
    #[instrument(skip(self, roots, target), fields(roots = roots.len(), dest = %target.display()))]
    pub async fn mirror_all(&self, roots: &[String], target: &Path) -> Result<(), MirrorError> {
        tokio::fs::create_dir_all(target)
            .await
            .map_err(|e| MirrorError::io(target, e))?;

        for root in roots {
            let status = self.mirror_root(root, target).await?;
            info!(url = %root, status = %status, "root finished");
        }
        Ok(())
    }

    /// Mirrors one root URL into the existing directory `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`MirrorError`] when the local destination is unusable.
    #[instrument(skip(self, target), fields(dest = %target.display()))]
    pub async fn mirror_root(&self, url: &str, target: &Path) -> Result<ResultStatus, MirrorError> {
        self.visit(url, target).await
    }

    /// Runs one directory or file under the retry driver.
    async fn visit(&self, url: &str, parent: &Path) -> Result<ResultStatus, MirrorError> {
        if is_directory_url(url) {
            let retried = self
                .retry_policy
                .run(url, move || self.walk_directory(url, parent))
                .await?;
            self.stats.record_attempts(retried.attempts);
            self.stats.record_directory(retried.outcome);
            if retried.outcome != ResultStatus::Success {
                warn!(url = %url, status = %retried.outcome, "directory not mirrored");
            }
            Ok(retried.outcome)
        } else {
            let retried = self
                .retry_policy
                .run(url, move || self.transfer_file(url, parent))
                .await?;
            let status = retried.outcome.status;
            self.stats.record_attempts(retried.attempts);
            self.stats.record_file(status);
            if matches!(status, ResultStatus::Error | ResultStatus::Retry) {
                warn!(url = %url, status = %status, "file not mirrored");
            }
            Ok(status)
        }
    }

    /// One attempt at one directory.
    fn walk_directory<'a>(
        &'a self,
        dir_url: &'a str,
        parent: &'a Path,
    ) -> BoxFuture<'a, Result<ResultStatus, MirrorError>> {
        async move {
            info!(url = %dir_url, "downloading directory");
            let page = match self.fetch_listing(dir_url).await? {
                Listing::Page(page) => page,
                Listing::Failed(status) => return Ok(status),
            };

            let links = match extract_links(&page, dir_url) {
                Ok(links) => links,
                Err(e) => {
                    warn!(url = %dir_url, error = %e, "unusable listing page");
                    return Ok(ResultStatus::Error);
                }
            };
            if links.is_empty() {
                debug!(url = %dir_url, "nothing to mirror");
                return Ok(ResultStatus::Success);
            }

            let local_dir = local_path(parent, &directory_name(dir_url));
            ensure_directory(&local_dir).await?;

            for link in &links {
                self.visit(link, &local_dir).await?;
            }
            Ok(ResultStatus::Success)
        }
        .boxed()
    }

    async fn fetch_listing(&self, dir_url: &str) -> Result<Listing, MirrorError> {
        let client = self.client.clone();
        let url = dir_url.to_string();
        let query = self.options.listing_query.clone();
        let reporter = &self.reporter;

        let fetched = supervise(
            dir_url,
            async move { client.fetch_listing(&url, query.as_deref()).await },
            self.options.listing_heartbeat,
            || reporter.heartbeat(dir_url),
        )
        .await?;

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %dir_url, error = %e, "connection error for directory");
                return Ok(Listing::Failed(status_for_transport(&e)));
            }
        };
        debug!(url = %dir_url, status = page.status.as_u16(), "directory page download done");

        if page.status != StatusCode::OK {
            warn!(url = %dir_url, status = page.status.as_u16(), "bad GET response for directory");
            return Ok(Listing::Failed(status_for_http(page.status)));
        }
        Ok(Listing::Page(page.body))
    }

    /// One attempt at one file.
    async fn transfer_file(&self, url: &str, parent: &Path) -> Result<TransferOutcome, MirrorError> {
        let job = TransferJob {
            client: self.client.clone(),
            url: url.to_string(),
            path: local_path(parent, &file_name(url)),
            skip_existing: self.options.skip_existing,
            progress: Arc::new(TransferProgress::new()),
        };
        let outcome = run_supervised(
            job,
            self.options.transfer_report_interval,
            self.reporter.as_ref(),
        )
        .await?;
        self.stats.add_bytes(outcome.bytes);
        Ok(outcome)
    }
}

async fn ensure_directory(path: &Path) -> Result<(), MirrorError> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| MirrorError::io(path, e))?;
    if !exists {
        info!(path = %path.display(), "create dir");
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| MirrorError::io(path, e))
}
