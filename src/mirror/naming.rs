//! Local names for remote directories and files.
//!
//! A URL path component becomes a local name by percent-decoding it and then
//! substituting every reserved character with a placeholder, one character
//! out for every character in.

use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use super::constants::{NAME_PLACEHOLDER, RESERVED_NAME_CHARS};

/// Replaces every reserved character with the placeholder.
///
/// The output has exactly as many characters as the input.
///
/// ```
/// use apachedl_core::mirror::clean_name;
///
/// assert_eq!(clean_name("a<b>:c"), "a-b--c");
/// ```
#[must_use]
pub fn clean_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_NAME_CHARS.contains(&c) {
                NAME_PLACEHOLDER
            } else {
                c
            }
        })
        .collect()
}

/// Percent-decodes a URL path component, falling back to the raw text.
#[must_use]
pub fn decode_component(component: &str) -> String {
    urlencoding::decode(component).map_or_else(
        |e| {
            debug!(component = %component, error = %e, "URL decoding failed, using raw segment");
            component.to_string()
        },
        std::borrow::Cow::into_owned,
    )
}

/// Local directory name for a listing URL: its last non-empty path segment.
///
/// The root of a host has no such segment and is named after the host.
#[must_use]
pub fn directory_name(dir_url: &str) -> String {
    let parsed = Url::parse(dir_url).ok();
    let segment = parsed
        .as_ref()
        .and_then(Url::path_segments)
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(str::to_string);

    let raw = segment
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(Url::host_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback_segment(dir_url));

    clean_name(&decode_component(&raw))
}

/// Local file name for a file URL: its last path segment.
#[must_use]
pub fn file_name(file_url: &str) -> String {
    let parsed = Url::parse(file_url).ok();
    let segment = parsed
        .as_ref()
        .and_then(Url::path_segments)
        .and_then(Iterator::last)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let raw = segment
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(Url::host_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback_segment(file_url));

    clean_name(&decode_component(&raw))
}

/// Last non-empty `/`-separated piece of an unparsable URL.
fn fallback_segment(url: &str) -> String {
    url.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or("index")
        .to_string()
}

/// Joins a local name under `parent`, extending the path for the local OS where needed.
#[must_use]
pub fn local_path(parent: &Path, name: &str) -> PathBuf {
    extend_long_path(parent.join(name))
}

/// Windows refuses paths past `MAX_PATH` unless they carry the verbatim prefix.
#[cfg(windows)]
fn extend_long_path(path: PathBuf) -> PathBuf {
    const MAX_PATH: usize = 259;
    let text = path.as_os_str().to_string_lossy();
    if text.len() > MAX_PATH && path.is_absolute() && !text.starts_with(r"\\?\") {
        PathBuf::from(format!(r"\\?\{text}"))
    } else {
        path
    }
}

#[cfg(not(windows))]
fn extend_long_path(path: PathBuf) -> PathBuf {
    path
}
