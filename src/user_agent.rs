//! User-Agent string for mirror requests.

/// Project URL sent with the User-Agent so server admins can identify the tool.
const PROJECT_UA_URL: &str = "https://github.com/fierce/apachedl";

/// Default User-Agent for listing and file requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("apachedl/{version} (+{PROJECT_UA_URL})")
}
