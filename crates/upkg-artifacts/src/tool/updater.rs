//! Keeping a usable copy of the artifact tool on disk.
//!
//! Installs live side by side under the tools root, one directory per
//! release: `ArtifactTool_{os}_{arch}_{version}`. A directory only appears
//! under that name once it is completely unpacked.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use upkg_core::archive::extract_zip_file;
use upkg_core::client::{ClientSetting, DownloadError, FileDownload, FileDownloadError};
use upkg_core::config::{ConfigApi, Settings};
use upkg_core::install::{Placement, install_dir, set_executable};
use upkg_core::ui::tracker::ProgressTrackerBuilder;
use upkg_core::{arch, dir, os};

use super::ToolError;
use super::artifacttool::ToolProvider;
use crate::credential::Credential;
use crate::org::Organization;
use crate::service::{DevOpsService, RestClient, ServiceError};

/// A directory holding an already unpacked tool. Used as-is, no network.
pub const OVERRIDE_PATH_ENV: &str = "AZURE_DEVOPS_EXT_ARTIFACTTOOL_OVERRIDE_PATH";

const TOOL_NAME: &str = "ArtifactTool";
const RELEASE_PATH: &str = "_apis/clienttools/ArtifactTool/release";
const API_VERSION: &str = "5.0-preview";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub uri: String,
    pub version: String,
}

/// Where releases are announced and fetched from.
pub trait ReleaseSource {
    fn latest(
        &self,
        organization: &Organization,
        credential: &Credential,
        os: &str,
        arch: &str,
    ) -> Result<Release, ToolError>;

    /// Download the release archive to `dest`.
    fn fetch(&self, release: &Release, dest: &Path) -> Result<(), ToolError>;
}

/// The organization's `clienttools` endpoint.
pub struct ServiceReleases<S> {
    service: S,
    setting: ClientSetting,
    interactive: bool,
}

impl<S: DevOpsService> ServiceReleases<S> {
    pub fn new(service: S, setting: ClientSetting, interactive: bool) -> Self {
        Self {
            service,
            setting,
            interactive,
        }
    }
}

impl<S: DevOpsService> ReleaseSource for ServiceReleases<S> {
    fn latest(
        &self,
        organization: &Organization,
        credential: &Credential,
        os: &str,
        arch: &str,
    ) -> Result<Release, ToolError> {
        let mut url = organization.api_url(RELEASE_PATH)?;
        url.query_pairs_mut()
            .append_pair("osName", os)
            .append_pair("arch", arch)
            .append_pair("api-version", API_VERSION);

        let value = self.service.get_json(&url, Some(credential))?;
        let release: Release =
            serde_json::from_value(value).map_err(|e| ServiceError::InvalidResponse {
                url: url.clone(),
                message: e.to_string(),
            })?;
        debug!(version = release.version, "latest artifact tool release");
        Ok(release)
    }

    fn fetch(&self, release: &Release, dest: &Path) -> Result<(), ToolError> {
        let url = Url::parse(&release.uri).map_err(|_| ToolError::UntrustedRelease {
            uri: release.uri.clone(),
        })?;
        let tracker = ProgressTrackerBuilder::default()
            .with_prefix(TOOL_NAME)
            .with_finish("downloaded")
            .hidden(!self.interactive);

        FileDownload::new(url, dest)
            .fetch_raw(self.setting.clone(), Some(tracker))
            .map_err(|e| match e {
                FileDownloadError::Download(DownloadError::Status { url, status }) => {
                    ToolError::Service(ServiceError::from_status(url, status, ""))
                }
                FileDownloadError::Download(DownloadError::ClientBuild { source }) => {
                    ToolError::Service(ServiceError::Client(source))
                }
                other => ToolError::Download(other),
            })
    }
}

pub struct ArtifactToolUpdater<R> {
    releases: R,
    tools_root: PathBuf,
    override_path: Option<PathBuf>,
}

impl ArtifactToolUpdater<ServiceReleases<RestClient>> {
    /// The production updater: tools under the configured (or default)
    /// tools directory, releases from the service, override from the
    /// environment.
    pub fn from_settings(settings: &Settings, interactive: bool) -> Result<Self, ToolError> {
        let tools_root = match &settings.tools_dir {
            Some(dir) => dir.clone(),
            None => default_tools_root().ok_or(ToolError::NoToolsDir)?,
        };
        let setting = ClientSetting::default().with_proxies(settings.proxies.clone());
        let releases =
            ServiceReleases::new(RestClient::new(setting.clone()), setting, interactive);

        Ok(Self::new(releases, tools_root)
            .with_override(env::var_os(OVERRIDE_PATH_ENV).map(PathBuf::from)))
    }
}

/// `<user data>/upkg/tools/artifacttool`
fn default_tools_root() -> Option<PathBuf> {
    Some(
        dir::data_home()?
            .join(ConfigApi::APP_DIR)
            .join("tools")
            .join("artifacttool"),
    )
}

impl<R: ReleaseSource> ArtifactToolUpdater<R> {
    pub fn new(releases: R, tools_root: PathBuf) -> Self {
        Self {
            releases,
            tools_root,
            override_path: None,
        }
    }

    pub fn with_override(mut self, dir: Option<PathBuf>) -> Self {
        self.override_path = dir.filter(|d| !d.as_os_str().is_empty());
        self
    }

    fn executable_in(dir: &Path) -> PathBuf {
        dir.join(os::detect().executable_name(TOOL_NAME))
    }

    fn install_name(os: &str, arch: &str, version: &str) -> String {
        format!("{TOOL_NAME}_{os}_{arch}_{version}")
    }

    fn install(&self, release: &Release, os: &str, arch: &str) -> Result<PathBuf, ToolError> {
        let uri = Url::parse(&release.uri).ok();
        if uri.as_ref().map(Url::scheme) != Some("https") {
            return Err(ToolError::UntrustedRelease {
                uri: release.uri.clone(),
            });
        }
        if Version::parse(&release.version).is_err() {
            return Err(ToolError::InvalidRelease {
                version: release.version.clone(),
            });
        }

        let dir = self
            .tools_root
            .join(Self::install_name(os, arch, &release.version));
        let exe = Self::executable_in(&dir);
        if exe.is_file() {
            debug!(path = %exe.display(), "artifact tool is up to date");
            return Ok(exe);
        }

        info!(version = release.version, "installing artifact tool");
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ToolError::Io { path, source }
        };
        fs::create_dir_all(&self.tools_root).map_err(io(&self.tools_root))?;

        let download = tempfile::Builder::new()
            .prefix(".download-")
            .tempdir_in(&self.tools_root)
            .map_err(io(&self.tools_root))?;
        let archive = download.path().join(format!("{TOOL_NAME}.zip"));
        self.releases.fetch(release, &archive)?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.tools_root)
            .map_err(io(&self.tools_root))?;
        let report = extract_zip_file(&archive, staging.path())?;
        debug!(entries = report.entry_count, bytes = report.total_bytes, "unpacked");

        let staged_exe = Self::executable_in(staging.path());
        if !staged_exe.is_file() {
            return Err(ToolError::MissingExecutable { path: staged_exe });
        }
        set_executable(&staged_exe)?;

        if dir.exists() {
            warn!(path = %dir.display(), "replacing incomplete artifact tool install");
            fs::remove_dir_all(&dir).map_err(io(&dir))?;
        }
        if install_dir(staging.path(), &dir)? == Placement::AlreadyPresent {
            debug!("artifact tool was installed concurrently");
        }
        if !exe.is_file() {
            return Err(ToolError::MissingExecutable { path: exe });
        }
        Ok(exe)
    }

    /// The highest version already unpacked for this platform.
    fn newest_installed(&self, os: &str, arch: &str) -> Option<(Version, PathBuf)> {
        let prefix = Self::install_name(os, arch, "");
        fs::read_dir(&self.tools_root)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let version = Version::parse(name.strip_prefix(&prefix)?).ok()?;
                let exe = Self::executable_in(&entry.path());
                exe.is_file().then_some((version, exe))
            })
            .max_by(|a, b| a.0.cmp(&b.0))
    }

    fn resolve(
        &self,
        organization: &Organization,
        credential: &Credential,
        os: &str,
        arch: &str,
    ) -> Result<PathBuf, ToolError> {
        match self.releases.latest(organization, credential, os, arch) {
            Ok(release) => self.install(&release, os, arch),
            Err(ToolError::Service(e)) if e.is_unreachable() => {
                match self.newest_installed(os, arch) {
                    Some((version, exe)) => {
                        warn!("{e}; using installed artifact tool {version}");
                        Ok(exe)
                    }
                    None => Err(ToolError::Service(e)),
                }
            }
            Err(e) => Err(e),
        }
    }
}

impl<R: ReleaseSource> ToolProvider for ArtifactToolUpdater<R> {
    fn executable(
        &self,
        organization: &Organization,
        credential: &Credential,
    ) -> Result<PathBuf, ToolError> {
        if let Some(dir) = &self.override_path {
            let exe = Self::executable_in(dir);
            debug!(path = %exe.display(), "using artifact tool override");
            if !exe.is_file() {
                return Err(ToolError::MissingExecutable { path: exe });
            }
            return Ok(exe);
        }

        let os = os::detect().release_name()?;
        let arch = arch::detect().release_name()?;
        self.resolve(organization, credential, os, arch)
    }
}
