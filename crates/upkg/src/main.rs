use std::process::ExitCode;

use clap::Parser;

use crate::cli::app::App;

mod cli;
mod logging;

fn main() -> ExitCode {
    let app = App::parse();
    logging::init(app.global.verbosity());

    match app.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{e:?}");
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}
