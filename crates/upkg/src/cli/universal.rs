use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use upkg_artifacts::org::Detect;
use upkg_artifacts::tool::{DownloadRequest, PublishRequest};
use upkg_artifacts::universal::{Target, Universal};
use upkg_core::config::ConfigApi;

#[derive(Debug, Subcommand)]
pub enum UniversalCommands {
    /// (PREVIEW) Publish a package to a feed.
    Publish(PublishArg),
    /// (PREVIEW) Download a package.
    Download(DownloadArg),
}

#[derive(Debug, Clone, Args)]
pub struct TargetArg {
    /// Azure DevOps organization URL, e.g. https://dev.azure.com/MyOrganizationName/
    #[arg(long, visible_alias = "org")]
    organization: Option<String>,
    /// Automatically detect the organization.
    #[arg(long, default_value = "on", value_name = "on|off")]
    detect: Detect,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        Target {
            organization: arg.organization,
            detect: arg.detect,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PackageArg {
    /// Name or ID of the feed.
    #[arg(long)]
    feed: String,
    /// Name of the package, e.g. 'foo-package'.
    #[arg(long)]
    name: String,
    /// Version of the package, e.g. '1.0.0'.
    #[arg(long = "version", value_name = "VERSION")]
    package_version: String,
}

#[derive(Debug, Clone, Args)]
pub struct PublishArg {
    #[command(flatten)]
    package: PackageArg,
    /// Directory containing the package contents.
    #[arg(long)]
    path: PathBuf,
    /// Description of the package.
    #[arg(long)]
    description: Option<String>,
    #[command(flatten)]
    target: TargetArg,
}

#[derive(Debug, Clone, Args)]
pub struct DownloadArg {
    #[command(flatten)]
    package: PackageArg,
    /// Directory to place the package contents.
    #[arg(long)]
    path: PathBuf,
    #[command(flatten)]
    target: TargetArg,
}

impl PublishArg {
    fn request(&self) -> PublishRequest {
        PublishRequest {
            feed: self.package.feed.clone(),
            name: self.package.name.clone(),
            version: self.package.package_version.clone(),
            path: self.path.clone(),
            description: self.description.clone(),
        }
    }
}

impl DownloadArg {
    fn request(&self) -> DownloadRequest {
        DownloadRequest {
            feed: self.package.feed.clone(),
            name: self.package.name.clone(),
            version: self.package.package_version.clone(),
            path: self.path.clone(),
        }
    }
}

impl UniversalCommands {
    pub fn run(self) -> Result<()> {
        let settings = ConfigApi::from_env()?
            .load()
            .context("failed to load configuration")?;
        let universal = Universal::from_settings(&settings)?;

        match self {
            UniversalCommands::Publish(arg) => {
                let published = universal.publish(&arg.request(), &arg.target.into())?;
                print_json(&published)
            }
            UniversalCommands::Download(arg) => {
                let downloaded = universal.download(&arg.request(), &arg.target.into())?;
                print_json(&downloaded)
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
