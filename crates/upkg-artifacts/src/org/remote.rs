//! Recognizing Azure DevOps Git remotes.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::Organization;

static DEV_AZURE_HTTPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:[^@/]+@)?dev\.azure\.com/([^/]+)").expect("valid regex")
});

static VISUALSTUDIO_HTTPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:[^@/]+@)?([^./@]+)\.visualstudio\.com(?:[:/]|$)")
        .expect("valid regex")
});

static DEV_AZURE_SSH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:ssh://)?[^@/]+@ssh\.dev\.azure\.com(?::\d+)?[:/]v3/([^/]+)/")
        .expect("valid regex")
});

static VISUALSTUDIO_SSH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:ssh://)?[^@/]+@vs-ssh\.visualstudio\.com(?::\d+)?[:/]v3/([^/]+)/")
        .expect("valid regex")
});

static GIT_HTTP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(https?://.+?/_git/[^/?#]+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteKind {
    /// The organization is spelled out in the remote itself.
    Known(Organization),
    /// A `/_git/` repository on some other host (an on-premises server or a
    /// custom domain). The organization has to be asked for.
    Collection(Url),
}

/// Classify a remote URL, returning `None` for anything that is not an
/// Azure DevOps repository.
pub fn parse_remote(remote: &str) -> Option<RemoteKind> {
    let remote = remote.trim();

    let known = |base: String| Organization::parse(&base).ok().map(RemoteKind::Known);

    if let Some(caps) = DEV_AZURE_HTTPS.captures(remote) {
        return known(format!("https://dev.azure.com/{}/", &caps[1]));
    }
    if let Some(caps) = DEV_AZURE_SSH.captures(remote) {
        return known(format!("https://dev.azure.com/{}/", &caps[1]));
    }
    if let Some(caps) = VISUALSTUDIO_SSH.captures(remote) {
        return known(format!("https://{}.visualstudio.com/", &caps[1]));
    }
    if let Some(caps) = VISUALSTUDIO_HTTPS.captures(remote) {
        return known(format!("https://{}.visualstudio.com/", &caps[1]));
    }
    if let Some(caps) = GIT_HTTP.captures(remote) {
        let mut url = Url::parse(&caps[1]).ok()?;
        // Credentials embedded in the remote must not leak into the lookup.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        return Some(RemoteKind::Collection(url));
    }
    None
}
