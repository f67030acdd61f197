use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::completion::CompletionArg;
use super::configure::ConfigureArg;
use super::universal::UniversalCommands;
use crate::logging::Verbosity;

#[derive(Debug, Parser)]
#[command(name = "upkg", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    #[arg(long, global = true)]
    verbose: bool,
    /// Show all debug logs.
    #[arg(long, global = true, conflicts_with = "verbose")]
    debug: bool,
    /// Only show errors, suppressing warnings.
    #[arg(long, global = true, conflicts_with_all = ["verbose", "debug"])]
    only_show_errors: bool,
}

impl GlobalArgs {
    pub fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else if self.only_show_errors {
            Verbosity::OnlyErrors
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// (PREVIEW) Manage Universal Packages.
    #[command(subcommand, alias = "u")]
    Universal(UniversalCommands),
    /// Show or set defaults such as the organization.
    #[command(alias = "cfg")]
    Configure(ConfigureArg),
    /// Print a shell completion script.
    Completion(CompletionArg),
}

impl App {
    pub fn run(self) -> Result<()> {
        match self.cmd {
            Commands::Universal(cmd) => cmd.run(),
            Commands::Configure(arg) => arg.run(),
            Commands::Completion(arg) => arg.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        App::command().debug_assert();
    }

    #[test]
    fn verbosity_flags() {
        let app = App::try_parse_from(["upkg", "--debug", "completion", "bash"]).unwrap();
        assert_eq!(app.global.verbosity(), Verbosity::Debug);

        let app = App::try_parse_from(["upkg", "completion", "bash", "--only-show-errors"]).unwrap();
        assert_eq!(app.global.verbosity(), Verbosity::OnlyErrors);

        let app = App::try_parse_from(["upkg", "completion", "bash"]).unwrap();
        assert_eq!(app.global.verbosity(), Verbosity::Normal);

        assert!(App::try_parse_from(["upkg", "--debug", "--only-show-errors", "completion", "bash"]).is_err());
    }
}
