//! Resumable single-file transfer.
//!
//! A transfer materialises one remote file at one local path. A file that is
//! missing or empty is downloaded in full. A non-empty file is checked with
//! `HEAD` first, and the rest is requested with `Range: bytes=<len>-` and
//! appended. All resume state comes from the local file size and the remote
//! headers; nothing else is persisted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use reqwest::{Response, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::client::MirrorClient;
use super::error::MirrorError;
use super::progress::{ProgressReporter, SnapshotSampler, TransferProgress, supervise};
use super::retry::{status_for_http, status_for_transport};
use super::status::{ResultStatus, TransferOutcome};

/// What is known about one file target before bytes move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferState {
    /// Bytes already on disk.
    pub local_len: u64,
    /// Remote `Content-Length`, when present and numeric.
    pub remote_len: Option<u64>,
    /// Whether the remote advertises `Accept-Ranges: bytes`.
    pub accepts_ranges: bool,
}

impl TransferState {
    /// State read from a successful `HEAD` response.
    #[must_use]
    pub fn from_head(local_len: u64, headers: &HeaderMap) -> Self {
        let remote_len = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let accepts_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));
        Self {
            local_len,
            remote_len,
            accepts_ranges,
        }
    }

    /// Whether a ranged `GET` may append to the local file.
    ///
    /// - unknown remote length: `Error`
    /// - remote length not larger than the local file: `Skip` (complete)
    /// - no byte-range support: `Error`
    /// - otherwise `Success`, meaning resume from `local_len`
    #[must_use]
    pub fn resume_decision(&self) -> ResultStatus {
        let Some(remote_len) = self.remote_len else {
            return ResultStatus::Error;
        };
        if remote_len <= self.local_len {
            return ResultStatus::Skip;
        }
        if !self.accepts_ranges {
            return ResultStatus::Error;
        }
        ResultStatus::Success
    }
}

/// One attempt at one file, owned so it can run as its own task.
#[derive(Debug)]
pub(crate) struct TransferJob {
    pub(crate) client: MirrorClient,
    pub(crate) url: String,
    pub(crate) path: PathBuf,
    pub(crate) skip_existing: bool,
    pub(crate) progress: Arc<TransferProgress>,
}

/// Runs a transfer attempt as a worker while `reporter` receives snapshots every `every`.
pub(crate) async fn run_supervised(
    job: TransferJob,
    every: Duration,
    reporter: &dyn ProgressReporter,
) -> Result<TransferOutcome, MirrorError> {
    let url = job.url.clone();
    let mut sampler = SnapshotSampler::new(url.clone(), Arc::clone(&job.progress));
    let outcome = supervise(&url, job.run(), every, || {
        reporter.progress(&sampler.sample());
    })
    .await??;

    info!(
        url = %url,
        status = %outcome.status,
        bytes = outcome.bytes,
        "transfer attempt finished"
    );
    Ok(outcome)
}

impl TransferJob {
    #[instrument(skip(self), fields(url = %self.url, path = %self.path.display()))]
    pub(crate) async fn run(self) -> Result<TransferOutcome, MirrorError> {
        if self.skip_existing && self.exists().await? {
            info!("file exists already, skipping");
            return Ok(TransferOutcome::without_bytes(ResultStatus::Skip));
        }

        let local_len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(MirrorError::io(&self.path, e)),
        };

        debug!(local_len, "saving to file");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MirrorError::io(&self.path, e))?;

        let resume_from = if local_len > 0 {
            match self.check_remote(local_len).await {
                ResultStatus::Success => Some(local_len),
                other => return Ok(TransferOutcome::without_bytes(other)),
            }
        } else {
            None
        };

        let response = match self.client.get(&self.url, resume_from).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "connection error on GET");
                return Ok(TransferOutcome::without_bytes(status_for_transport(&e)));
            }
        };

        let status = response.status();
        if status.as_u16() >= 300 {
            warn!(status = status.as_u16(), "bad GET response");
            return Ok(TransferOutcome::without_bytes(status_for_http(status)));
        }

        let mut offset = resume_from.unwrap_or(0);
        if resume_from.is_some() && status != StatusCode::PARTIAL_CONTENT {
            warn!(
                status = status.as_u16(),
                "server ignored the byte range, restarting from zero"
            );
            file.set_len(0)
                .await
                .map_err(|e| MirrorError::io(&self.path, e))?;
            offset = 0;
        }

        self.progress.set_offset(offset);
        if let Some(total) = total_length(&response, offset) {
            self.progress.set_total(total);
        }
        info!(
            offset,
            total = ?self.progress.total(),
            "downloading"
        );

        Ok(self.stream_to_file(file, offset, response).await)
    }

    async fn exists(&self) -> Result<bool, MirrorError> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| MirrorError::io(&self.path, e))
    }

    /// Asks the server whether the partial local file can be extended.
    async fn check_remote(&self, local_len: u64) -> ResultStatus {
        let response = match self.client.head(&self.url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "connection error on HEAD");
                return status_for_transport(&e);
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "bad HEAD response");
            return status_for_http(response.status());
        }

        let state = TransferState::from_head(local_len, response.headers());
        let decision = state.resume_decision();
        match decision {
            ResultStatus::Skip => info!(
                local_len,
                remote_len = ?state.remote_len,
                "file is already complete"
            ),
            ResultStatus::Error if state.remote_len.is_none() => {
                warn!("HEAD response has no usable Content-Length");
            }
            ResultStatus::Error => {
                warn!("server does not accept byte ranges, cannot resume partial file");
            }
            _ => debug!(local_len, remote_len = ?state.remote_len, "resuming"),
        }
        decision
    }

    /// Appends the response body. Any failure mid-stream is transient and
    /// reports the bytes that made it to disk.
    async fn stream_to_file(
        &self,
        file: File,
        start_len: u64,
        response: Response,
    ) -> TransferOutcome {
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, written, "download interrupted");
                    let on_disk = self.settle(&mut writer, written, start_len).await;
                    return TransferOutcome::with_bytes(ResultStatus::Retry, on_disk);
                }
            };

            if let Err(e) = writer.write_all(&chunk).await {
                warn!(error = %e, written, "write to disk failed");
                let on_disk = self.settle(&mut writer, written, start_len).await;
                return TransferOutcome::with_bytes(ResultStatus::Retry, on_disk);
            }

            let len = chunk.len() as u64;
            written += len;
            self.progress.add(len);
        }

        let on_disk = self.settle(&mut writer, written, start_len).await;
        if on_disk < written {
            return TransferOutcome::with_bytes(ResultStatus::Retry, on_disk);
        }
        TransferOutcome::with_bytes(ResultStatus::Success, written)
    }

    /// Flushes `writer` and returns how many of the `written` bytes reached the
    /// file, which held `start_len` bytes before this attempt.
    async fn settle(&self, writer: &mut BufWriter<File>, written: u64, start_len: u64) -> u64 {
        let Err(e) = writer.flush().await else {
            return written;
        };
        let on_disk = tokio::fs::metadata(&self.path)
            .await
            .map_or(0, |meta| meta.len().saturating_sub(start_len));
        warn!(error = %e, written, on_disk, "flush to disk failed");
        on_disk.min(written)
    }
}

/// Full remote length: a `206` body only covers the bytes after `offset`.
fn total_length(response: &Response, offset: u64) -> Option<u64> {
    let current = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if response.status() == StatusCode::PARTIAL_CONTENT {
        current.map(|remaining| offset.saturating_add(remaining))
    } else {
        current
    }
}
