use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use upkg_artifacts::org::Organization;
use upkg_core::config::{ConfigApi, Settings};

#[derive(Debug, Clone, Args)]
pub struct ConfigureArg {
    /// Default organization URL. Pass an empty string to clear it.
    #[arg(long, visible_alias = "org")]
    organization: Option<String>,
    /// Print the effective configuration.
    #[arg(long, short)]
    list: bool,
}

impl ConfigureArg {
    pub fn run(self) -> Result<()> {
        let api = ConfigApi::from_env()?;

        if let Some(organization) = &self.organization {
            let mut settings = api.load_file().context("failed to read configuration")?;
            apply_organization(&mut settings, organization)?;
            api.save(&settings)?;
            info!(path = %api.path().display(), "configuration saved");
        }

        if self.list || self.organization.is_none() {
            let settings = api.load().context("failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Ok(())
    }
}

fn apply_organization(settings: &mut Settings, organization: &str) -> Result<()> {
    settings.defaults.organization = if organization.trim().is_empty() {
        None
    } else {
        Some(Organization::parse(organization)?.to_string())
    };
    Ok(())
}
