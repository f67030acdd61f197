//! Per-user base directories.
//!
//! XDG variables are honoured on Unix-likes other than macOS; Windows uses
//! the roaming and local AppData folders.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Where settings live, e.g. `~/.config`.
pub fn config_home() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        from_home("Library/Application Support")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        xdg_or_home(env::var_os("XDG_CONFIG_HOME"), home::home_dir(), ".config")
    }
}

/// Where downloaded tools and other bulky state live, e.g. `~/.local/share`.
pub fn data_home() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("LOCALAPPDATA").map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        from_home("Library/Application Support")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        xdg_or_home(env::var_os("XDG_DATA_HOME"), home::home_dir(), ".local/share")
    }
}

#[cfg(target_os = "macos")]
fn from_home(rel: &str) -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(rel))
}

/// XDG says relative values must be ignored.
#[cfg_attr(any(target_os = "windows", target_os = "macos"), allow(dead_code))]
fn xdg_or_home(var: Option<OsString>, home: Option<PathBuf>, rel: &str) -> Option<PathBuf> {
    var.map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| home.map(|h| h.join(rel)))
}
