//! Outcome types shared by every mirror operation.
//!
//! Every remote operation (listing fetch, HEAD check, file transfer) reduces
//! to exactly one [`ResultStatus`]. Transfers additionally carry the number of
//! bytes written during the attempt in a [`TransferOutcome`].

use std::fmt;

/// Terminal classification of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    /// The operation completed.
    Success,
    /// Transient failure (connection error, 5xx); the attempt should be repeated.
    Retry,
    /// Nothing to do: the target is already complete or intentionally bypassed.
    Skip,
    /// Permanent failure for this node only; never retried.
    Error,
}

impl ResultStatus {
    /// Returns true when another attempt may change the outcome.
    #[must_use]
    pub fn is_retry(self) -> bool {
        self == Self::Retry
    }

    /// Short lowercase label used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Retry => "retry",
            Self::Skip => "skip",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one transfer attempt: the status plus bytes appended this attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Classification of the attempt.
    pub status: ResultStatus,
    /// Bytes written to disk during this attempt (partial on `Retry`).
    pub bytes: u64,
}

impl TransferOutcome {
    /// An outcome that wrote no bytes.
    #[must_use]
    pub fn without_bytes(status: ResultStatus) -> Self {
        Self { status, bytes: 0 }
    }

    /// An outcome carrying a byte count.
    #[must_use]
    pub fn with_bytes(status: ResultStatus, bytes: u64) -> Self {
        Self { status, bytes }
    }
}

/// Anything the retry driver can inspect for a [`ResultStatus`].
pub trait Attempt {
    /// The status that decides whether the driver tries again.
    fn status(&self) -> ResultStatus;
}

impl Attempt for ResultStatus {
    fn status(&self) -> ResultStatus {
        *self
    }
}

impl Attempt for TransferOutcome {
    fn status(&self) -> ResultStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_retry_is_retryable() {
        assert!(ResultStatus::Retry.is_retry());
        assert!(!ResultStatus::Success.is_retry());
        assert!(!ResultStatus::Skip.is_retry());
        assert!(!ResultStatus::Error.is_retry());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(ResultStatus::Success.to_string(), "success");
        assert_eq!(ResultStatus::Skip.to_string(), "skip");
    }

    #[test]
    fn test_transfer_outcome_reports_its_status() {
        let outcome = TransferOutcome::with_bytes(ResultStatus::Retry, 42);
        assert_eq!(outcome.status(), ResultStatus::Retry);
        assert_eq!(outcome.bytes, 42);
        assert_eq!(
            TransferOutcome::without_bytes(ResultStatus::Skip).bytes,
            0
        );
    }
}
