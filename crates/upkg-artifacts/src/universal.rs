//! `universal publish` and `universal download`.

use std::env;
use std::path::PathBuf;

use tracing::{debug, warn};
use upkg_core::client::ClientSetting;
use upkg_core::config::Settings;
use upkg_core::ui;

use crate::Result;
use crate::credential::{Credential, EnvCredentials};
use crate::org::{Detect, DetectingResolver, GitRemoteDetector, OrganizationResolver};
use crate::service::RestClient;
use crate::tool::{
    ArtifactTool, ArtifactToolInvoker, ArtifactToolUpdater, DownloadRequest, DownloadedPackage,
    ProgressReportingInvoker, PublishRequest, PublishedPackage, ServiceReleases,
};

pub const PREVIEW_MESSAGE: &str = "Universal Packages is currently in preview.";

/// Where the package lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub organization: Option<String>,
    pub detect: Detect,
}

pub struct Universal<R, T> {
    resolver: R,
    tool: T,
}

pub type DefaultResolver = DetectingResolver<GitRemoteDetector<RestClient>>;
pub type DefaultTool = ArtifactToolInvoker<
    ProgressReportingInvoker,
    ArtifactToolUpdater<ServiceReleases<RestClient>>,
    EnvCredentials,
>;

impl Universal<DefaultResolver, DefaultTool> {
    /// Wire up the real resolver and tool from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let interactive = ui::interactive();
        let setting = ClientSetting::default().with_proxies(settings.proxies.clone());
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let detector = GitRemoteDetector::new(&cwd, RestClient::new(setting))
            .with_credential(Credential::from_env());
        let resolver = DetectingResolver::new(detector, settings.defaults.organization.clone());

        let updater = ArtifactToolUpdater::from_settings(settings, interactive)?;
        let tool = ArtifactToolInvoker::new(
            ProgressReportingInvoker::new(interactive),
            updater,
            EnvCredentials,
        );

        Ok(Self::new(resolver, tool))
    }
}

impl<R: OrganizationResolver, T: ArtifactTool> Universal<R, T> {
    pub fn new(resolver: R, tool: T) -> Self {
        Self { resolver, tool }
    }

    pub fn publish(&self, request: &PublishRequest, target: &Target) -> Result<PublishedPackage> {
        announce();
        let organization = self
            .resolver
            .resolve(target.organization.as_deref(), target.detect)?;
        debug!(%organization, feed = request.feed, "publishing");
        Ok(self.tool.publish(&organization, request)?)
    }

    pub fn download(&self, request: &DownloadRequest, target: &Target) -> Result<DownloadedPackage> {
        announce();
        let organization = self
            .resolver
            .resolve(target.organization.as_deref(), target.detect)?;
        debug!(%organization, feed = request.feed, "downloading");
        Ok(self.tool.download(&organization, request)?)
    }
}

fn announce() {
    ui::init_terminal();
    warn!("{PREVIEW_MESSAGE}");
}
