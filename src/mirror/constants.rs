//! Constants for the mirror engine (retry budget, cadences, timeouts).

use std::time::Duration;

/// Attempt ceiling shared by directory fetches and file transfers.
pub const MAX_ATTEMPTS: u32 = 5;

/// Backoff unit: attempt `i` waits `i` units before the next one.
pub const BACKOFF_UNIT: Duration = Duration::from_secs(5);

/// Heartbeat cadence while a listing page is being fetched.
pub const LISTING_HEARTBEAT: Duration = Duration::from_millis(100);

/// Progress snapshot cadence while a file is streaming.
pub const TRANSFER_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Query appended to listing requests so Apache serves the plain list format.
pub const PLAIN_LISTING_QUERY: &str = "F=0";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-read idle timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Characters that may not appear in a local file or directory name.
pub const RESERVED_NAME_CHARS: &[char] = &['<', '>', ':', '/', '|', '?', '*', '"', '\\'];

/// Replacement for every reserved character.
pub const NAME_PLACEHOLDER: char = '-';
