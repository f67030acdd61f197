use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, trace};
use upkg_platform::command::Command;

use super::remote::{RemoteKind, parse_remote};
use super::{Detector, Organization, OrganizationError};
use crate::credential::Credential;
use crate::service::{DevOpsService, ServiceError};

/// Finds the organization from the Git remotes of a working directory.
pub struct GitRemoteDetector<S> {
    cwd: PathBuf,
    service: S,
    credential: Option<Credential>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VstsInfo {
    server_url: String,
    collection: Collection,
}

#[derive(Debug, Deserialize)]
struct Collection {
    name: String,
}

impl<S: DevOpsService> GitRemoteDetector<S> {
    pub fn new(cwd: &Path, service: S) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            service,
            credential: None,
        }
    }

    /// Sent along with the `vsts/info` lookup for remotes on unknown hosts.
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// Remote URLs in the order they should be tried.
    fn remotes(&self) -> Vec<String> {
        let git = match which::which("git") {
            Ok(git) => git,
            Err(e) => {
                debug!("git not available: {e}");
                return Vec::new();
            }
        };

        let origin = Command::new(&git)
            .args(["config", "--get", "remote.origin.url"])
            .current_dir(&self.cwd)
            .stdout_string();

        let mut remotes = Vec::new();
        if let Ok(origin) = origin {
            if !origin.is_empty() {
                remotes.push(origin);
            }
        }

        match Command::new(&git)
            .args(["remote", "-v"])
            .current_dir(&self.cwd)
            .stdout_string()
        {
            Ok(listing) => {
                for url in remote_urls(&listing) {
                    if !remotes.contains(&url) {
                        remotes.push(url);
                    }
                }
            }
            Err(e) => trace!("git remote -v: {e}"),
        }
        remotes
    }

    pub fn organization_for(&self, remote: &str) -> Result<Option<Organization>, OrganizationError> {
        match parse_remote(remote) {
            Some(RemoteKind::Known(org)) => Ok(Some(org)),
            Some(RemoteKind::Collection(repo)) => {
                let mut info_url = repo.clone();
                info_url.set_path(&format!("{}/vsts/info", repo.path().trim_end_matches('/')));

                let value = self.service.get_json(&info_url, self.credential.as_ref())?;
                let info: VstsInfo =
                    serde_json::from_value(value).map_err(|e| ServiceError::InvalidResponse {
                        url: info_url.clone(),
                        message: e.to_string(),
                    })?;
                Organization::parse(&collection_uri(&info)).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl<S: DevOpsService> Detector for GitRemoteDetector<S> {
    fn detect(&self) -> Result<Option<Organization>, OrganizationError> {
        for remote in self.remotes() {
            if let Some(org) = self.organization_for(&remote)? {
                return Ok(Some(org));
            }
        }
        Ok(None)
    }
}

/// Unique URLs from `git remote -v` output, preserving order.
fn remote_urls(listing: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for line in listing.lines() {
        if let Some(url) = line.split_whitespace().nth(1) {
            if !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

fn collection_uri(info: &VstsInfo) -> String {
    let server = info.server_url.trim_end_matches('/');
    let name = &info.collection.name;
    if server
        .rsplit('/')
        .next()
        .is_some_and(|last| last.eq_ignore_ascii_case(name))
    {
        format!("{server}/")
    } else {
        format!("{server}/{name}/")
    }
}
