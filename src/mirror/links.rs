//! Child link discovery on directory listing pages.
//!
//! Listing pages are auto-generated HTML, not XML, so anchors are found with a
//! tolerant tag scanner that does not care whether the document is well formed.
//! Every `href` is then decomposed, filtered and resolved against the directory
//! URL the page was fetched from.
//!
//! # Filtering rules
//!
//! - The first anchor on the page is the parent-directory link and is never followed.
//! - Links to another host are dropped (same-host recursion only).
//! - Absolute paths are kept only below the listed directory; the directory
//!   prefix is stripped once.
//! - Parent traversal (`..`), empty, self (`.`), query-only and fragment-only
//!   links are dropped.
//! - Query strings and fragments are not carried into the child URL.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, trace};
use url::Url;

/// Matches an opening anchor tag and captures its attribute text.
#[allow(clippy::expect_used)]
static ANCHOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("anchor regex is valid"));

/// Matches an `href` attribute in double-quoted, single-quoted or bare form.
#[allow(clippy::expect_used)]
static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("href regex is valid")
});

/// Permissive URL shape: optional scheme, optional authority, path, query, fragment.
#[allow(clippy::expect_used)]
static URL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:([A-Za-z][A-Za-z0-9+.\-]*):)?(?://([^/?#]*))?([^?#]*)(?:\?[^#]*)?(?:#.*)?$")
        .expect("URL shape regex is valid")
});

/// Any tag-looking sequence; a page without one is not a listing.
#[allow(clippy::expect_used)]
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z!/]").expect("tag regex is valid"));

/// Errors that make a listing page unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// The directory URL the page was fetched from is not an absolute URL with a host.
    #[error("invalid listing base URL: {url}")]
    InvalidBase {
        /// The rejected base URL.
        url: String,
    },

    /// The page body contains no markup at all.
    #[error("listing page for {url} is not markup")]
    NotMarkup {
        /// The directory URL.
        url: String,
    },
}

/// Returns true when the URL names a directory (trailing `/`).
#[must_use]
pub fn is_directory_url(url: &str) -> bool {
    url.ends_with('/')
}

/// Extracts the child URLs of a directory listing page in page order.
///
/// `base_url` is the directory URL the page was fetched from, with its
/// trailing `/`. Children that are directories keep their trailing `/`.
///
/// # Errors
///
/// Returns [`ListingError::InvalidBase`] if `base_url` cannot be parsed or has
/// no host, and [`ListingError::NotMarkup`] if `page` holds no tags.
///
/// # Examples
///
/// ```
/// use apachedl_core::mirror::extract_links;
///
/// let page = r#"<ul><li><a href="/pub/">Parent Directory</a></li>
///               <li><a href="iso/">iso/</a></li>
///               <li><a href="README">README</a></li></ul>"#;
/// let links = extract_links(page, "http://mirror.example/pub/debian/").unwrap();
/// assert_eq!(
///     links,
///     vec![
///         "http://mirror.example/pub/debian/iso/",
///         "http://mirror.example/pub/debian/README",
///     ]
/// );
/// ```
#[instrument(skip(page), fields(page_len = page.len()))]
pub fn extract_links(page: &str, base_url: &str) -> Result<Vec<String>, ListingError> {
    let base = Url::parse(base_url).map_err(|_| ListingError::InvalidBase {
        url: base_url.to_string(),
    })?;
    if base.host_str().is_none() {
        return Err(ListingError::InvalidBase {
            url: base_url.to_string(),
        });
    }
    if !ANY_TAG.is_match(page) {
        return Err(ListingError::NotMarkup {
            url: base_url.to_string(),
        });
    }

    let mut links = Vec::new();
    // The first anchor points at the parent directory.
    for anchor in ANCHOR_TAG.captures_iter(page).skip(1) {
        let attributes = anchor.get(1).map_or("", |m| m.as_str());
        let Some(href) = href_value(attributes) else {
            trace!("anchor without href");
            continue;
        };
        trace!(href = %href, "link found on page");

        match relative_child_path(&href, &base).map(|path| format!("{base_url}{path}")) {
            Some(child) if stays_below(&child, &base) => links.push(child),
            _ => debug!(href = %href, "link discarded"),
        }
    }

    debug!(count = links.len(), "links extracted");
    Ok(links)
}

fn href_value(attributes: &str) -> Option<String> {
    let caps = HREF_ATTR.captures(attributes)?;
    let raw = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map_or("", |m| m.as_str());
    Some(raw.trim().replace("&amp;", "&"))
}

/// Reduces an href to a path relative to `base`, or `None` when it must not be followed.
fn relative_child_path(href: &str, base: &Url) -> Option<String> {
    let caps = URL_SHAPE.captures(href)?;
    let scheme = caps.get(1).map(|m| m.as_str());
    let authority = caps.get(2).map(|m| m.as_str());
    let mut path = caps.get(3).map_or("", |m| m.as_str());

    if let Some(scheme) = scheme
        && !scheme.eq_ignore_ascii_case("http")
        && !scheme.eq_ignore_ascii_case("https")
    {
        return None;
    }

    if let Some(authority) = authority
        && !same_host(scheme.unwrap_or(base.scheme()), authority, base)
    {
        return None;
    }

    if path.starts_with('/') {
        path = path.strip_prefix(base.path())?;
    }

    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }

    if path.is_empty() || path == "." {
        return None;
    }
    if path.starts_with("..") || path.split(['/', '\\']).any(is_dot_segment) {
        return None;
    }

    Some(path.to_string())
}

/// `.` or `..` once percent-decoded, which is how URL resolution sees them.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.into(), |d| d);
    decoded == "." || decoded == ".."
}

/// Whether `child` resolves strictly below `base`.
fn stays_below(child: &str, base: &Url) -> bool {
    Url::parse(child).is_ok_and(|resolved| {
        resolved.path().len() > base.path().len() && resolved.path().starts_with(base.path())
    })
}

fn same_host(scheme: &str, authority: &str, base: &Url) -> bool {
    let Ok(other) = Url::parse(&format!("{scheme}://{authority}/")) else {
        return false;
    };
    let same_name = match (other.host_str(), base.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    same_name && other.port_or_known_default() == base.port_or_known_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BASE: &str = "http://e.f/e/";

    fn page_with(hrefs: &[&str]) -> String {
        let mut page = String::from("<html><body><ul><li><a href=\"/\">Parent Directory</a></li>");
        for href in hrefs {
            page.push_str(&format!("<li><a href=\"{href}\">x</a></li>\n"));
        }
        page.push_str("</ul></body></html>");
        page
    }

    #[test]
    fn test_reference_listing_yields_expected_children() {
        let page = r##"<html><body>
            <a>0</a>
            <a href="">0</a>
            <a href="/">0</a>
            <a href="/0">0</a>
            <a href="/000000000">0</a>
            <a href="?no=yes">0</a>
            <a href="#go">0</a>
            <a href="http://f.g/e/01">0</a>
            <a href="//e.f/e/">0</a>
            <a href="//f.g/e/02">0</a>

            <a href="1/">1</a>
            <a href="2/2">2</a>
            <a href="/e/3/">3</a>
            <a href="http://e.f/e/4/">4</a>
            <a href="5">5</a>
            <a href="666666">6</a>
            <a href="7?no=yes">7</a>
            <a href="8#go">8</a>
            <a href="//e.f/e/9">9</a>
        </body></html>"##;

        let links = extract_links(page, BASE).unwrap();
        assert_eq!(
            links,
            vec![
                "http://e.f/e/1/",
                "http://e.f/e/2/2",
                "http://e.f/e/3/",
                "http://e.f/e/4/",
                "http://e.f/e/5",
                "http://e.f/e/666666",
                "http://e.f/e/7",
                "http://e.f/e/8",
                "http://e.f/e/9",
            ]
        );
    }

    #[test]
    fn test_first_anchor_is_never_followed() {
        let page = r#"<ul><li><a href="child/">child</a></li><li><a href="file">f</a></li></ul>"#;
        let links = extract_links(page, BASE).unwrap();
        assert_eq!(links, vec!["http://e.f/e/file"]);
    }

    #[test]
    fn test_cross_host_links_are_excluded() {
        let links = extract_links(
            &page_with(&["http://other.host/e/a", "//other.host/e/b", "https://E.F/e/c"]),
            BASE,
        )
        .unwrap();
        // https on the same host resolves to a different default port.
        assert!(links.is_empty(), "got {links:?}");
    }

    #[test]
    fn test_same_host_with_explicit_port() {
        let links = extract_links(
            &page_with(&["http://127.0.0.1:8080/pub/a", "http://127.0.0.1:9090/pub/b"]),
            "http://127.0.0.1:8080/pub/",
        )
        .unwrap();
        assert_eq!(links, vec!["http://127.0.0.1:8080/pub/a"]);
    }

    #[test]
    fn test_absolute_path_prefix_is_stripped_once() {
        let links = extract_links(&page_with(&["/e/e/x", "/elsewhere/y", "/e"]), BASE).unwrap();
        assert_eq!(links, vec!["http://e.f/e/e/x"]);
    }

    #[test]
    fn test_parent_traversal_is_excluded() {
        let links =
            extract_links(&page_with(&["../", "..", "..hidden", "a/../../b", "ok/"]), BASE)
                .unwrap();
        assert_eq!(links, vec!["http://e.f/e/ok/"]);
    }

    #[test]
    fn test_encoded_dot_segments_are_excluded() {
        let links = extract_links(
            &page_with(&[
                "%2e%2e/",
                "%2E/",
                "%2e",
                "a/%2e%2e/%2e%2e/z",
                ".%2E/x",
                "a/%2e/b",
                "a\\..\\..\\z",
                "deeper/",
            ]),
            BASE,
        )
        .unwrap();
        assert_eq!(links, vec!["http://e.f/e/deeper/"]);
    }

    #[test]
    fn test_resolution_must_stay_below_base() {
        let base = Url::parse(BASE).unwrap();
        assert!(stays_below("http://e.f/e/a", &base));
        assert!(!stays_below("http://e.f/e/", &base));
        assert!(!stays_below("http://e.f/e/%2E/", &base));
        assert!(!stays_below("http://e.f/e/x/%2e%2e/%2e%2e/", &base));
    }

    #[test]
    fn test_self_query_and_fragment_only_links_are_excluded() {
        let links = extract_links(&page_with(&[".", "./", "?C=N;O=D", "#top", ""]), BASE).unwrap();
        assert!(links.is_empty(), "got {links:?}");
    }

    #[test]
    fn test_dot_slash_prefix_is_removed() {
        // Apache writes names containing a colon as ./name
        let links = extract_links(&page_with(&["./a:b.txt"]), BASE).unwrap();
        assert_eq!(links, vec!["http://e.f/e/a:b.txt"]);
    }

    #[test]
    fn test_non_http_schemes_are_excluded() {
        let links =
            extract_links(&page_with(&["mailto:admin@e.f", "javascript:void(0)"]), BASE).unwrap();
        assert!(links.is_empty(), "got {links:?}");
    }

    #[test]
    fn test_tolerates_sloppy_markup() {
        let page = "<HTML><BODY><A HREF=\"/\">up</A><P><A HREF='one'>1<a href=two>2<a\nhref = \"three/\" class=dir>3";
        let links = extract_links(page, BASE).unwrap();
        assert_eq!(
            links,
            vec!["http://e.f/e/one", "http://e.f/e/two", "http://e.f/e/three/"]
        );
    }

    #[test]
    fn test_anchors_without_href_and_lookalike_tags_are_ignored() {
        let page = r#"<a href="/">up</a><abbr href="x">no</abbr><a name="top">t</a><a data-href="y" href="z">z</a>"#;
        let links = extract_links(page, BASE).unwrap();
        assert_eq!(links, vec!["http://e.f/e/z"]);
    }

    #[test]
    fn test_entity_encoded_ampersand_is_decoded() {
        let links = extract_links(&page_with(&["a&amp;b"]), BASE).unwrap();
        assert_eq!(links, vec!["http://e.f/e/a&b"]);
    }

    #[test]
    fn test_percent_encoding_is_preserved() {
        let links = extract_links(&page_with(&["my%20file.iso"]), BASE).unwrap();
        assert_eq!(links, vec!["http://e.f/e/my%20file.iso"]);
    }

    #[test]
    fn test_root_listing_base() {
        let links = extract_links(&page_with(&["/pub/", "/"]), "http://e.f/").unwrap();
        assert_eq!(links, vec!["http://e.f/pub/"]);
    }

    #[test]
    fn test_page_with_single_anchor_has_no_children() {
        let links = extract_links(r#"<a href="/">Parent Directory</a>"#, BASE).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_non_markup_body_is_an_error() {
        let result = extract_links("just some text", BASE);
        assert_eq!(
            result,
            Err(ListingError::NotMarkup {
                url: BASE.to_string()
            })
        );
    }

    #[test]
    fn test_invalid_base_is_an_error() {
        let result = extract_links("<a href=x>", "not a url/");
        assert!(matches!(result, Err(ListingError::InvalidBase { .. })));
    }

    #[test]
    fn test_is_directory_url() {
        assert!(is_directory_url("http://e.f/e/"));
        assert!(!is_directory_url("http://e.f/e/file"));
    }
}
