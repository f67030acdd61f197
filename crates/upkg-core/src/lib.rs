// Shared plumbing for the upkg crates: HTTP client, runtime, settings,
// tool installation and terminal presentation.

pub use upkg_platform::{arch, command, dir, os};

pub mod archive;
pub mod client;
pub mod config;
pub mod install;
pub mod task_pool;
pub mod ui;
