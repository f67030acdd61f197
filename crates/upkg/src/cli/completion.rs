use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};

use super::app::App;

#[derive(Debug, Clone, Args)]
pub struct CompletionArg {
    /// Shell to generate the script for.
    shell: Shell,
}

impl CompletionArg {
    pub fn run(self) -> Result<()> {
        let mut cmd = App::command();
        let name = cmd.get_name().to_string();
        generate(self.shell, &mut cmd, name, &mut std::io::stdout());
        Ok(())
    }
}
