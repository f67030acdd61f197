//! Running the external `ArtifactTool` executable.

mod artifacttool;
mod event;
mod invoker;
mod updater;

pub use artifacttool::{
    ArtifactTool, ArtifactToolInvoker, DownloadRequest, DownloadedPackage, PAT_ENV_KEY,
    PublishRequest, PublishedPackage, ToolProvider,
};
pub use event::{Level, LogEvent};
pub use invoker::{ExternalToolInvoker, Invocation, ProgressReportingInvoker};
pub use updater::{ArtifactToolUpdater, OVERRIDE_PATH_ENV, Release, ReleaseSource, ServiceReleases};

use std::path::PathBuf;

use thiserror::Error;
use upkg_core::archive::ArchiveError;
use upkg_core::client::FileDownloadError;
use upkg_core::install::InstallError;

use crate::credential::CredentialError;
use crate::org::OrganizationError;
use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{program} exited with {}: {message}", describe_exit(.code))]
    Exit {
        program: String,
        code: Option<i32>,
        message: String,
    },

    #[error("failed to run the artifact tool: {0}")]
    Spawn(#[source] upkg_platform::Error),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unpack the artifact tool: {0}")]
    Archive(#[from] ArchiveError),

    #[error("failed to install the artifact tool: {0}")]
    Install(#[from] InstallError),

    #[error("failed to download the artifact tool: {0}")]
    Download(#[source] FileDownloadError),

    #[error(transparent)]
    Platform(#[from] upkg_platform::Error),

    #[error("refusing to download the artifact tool over an untrusted channel: {uri}")]
    UntrustedRelease { uri: String },

    #[error("the service offered an artifact tool release with an unusable version: {version}")]
    InvalidRelease { version: String },

    #[error("the artifact tool executable was not found at {}", .path.display())]
    MissingExecutable { path: PathBuf },

    #[error("could not determine where to install tools; set UPKG_TOOLS_DIR")]
    NoToolsDir,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Organization(#[from] OrganizationError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}
