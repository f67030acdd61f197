//! Operating system detection.

use once_cell::sync::Lazy;
use std::env::consts;
use sysinfo::System;

use crate::{Error, Result};

/// Operating system types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OS {
    Windows,
    Macos,
    Linux,
    Unknown,
}

impl From<&str> for OS {
    fn from(s: &str) -> Self {
        match s {
            "windows" => OS::Windows,
            "macos" => OS::Macos,
            "linux" => OS::Linux,
            _ => OS::Unknown,
        }
    }
}

impl OS {
    /// Name the artifact service expects in its `osName` query parameter.
    pub fn release_name(self) -> Result<&'static str> {
        match self {
            OS::Windows => Ok("Windows"),
            OS::Macos => Ok("Darwin"),
            OS::Linux => Ok("Linux"),
            OS::Unknown => Err(Error::UnsupportedOS(consts::OS.to_string())),
        }
    }

    /// File name of an executable called `stem` on this OS.
    pub fn executable_name(self, stem: &str) -> String {
        match self {
            OS::Windows => format!("{stem}.exe"),
            _ => stem.to_string(),
        }
    }
}

static OS_VERSION: Lazy<String> = Lazy::new(|| {
    System::long_os_version().unwrap_or_else(|| consts::OS.to_string())
});

/// Detect current operating system.
pub fn detect() -> OS {
    OS::from(consts::OS)
}

/// Human readable OS description, e.g. `Linux (Ubuntu 24.04)`.
pub fn version() -> &'static str {
    OS_VERSION.as_str()
}
