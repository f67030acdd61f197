use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::dir;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a configuration directory; set UPKG_CONFIG_DIR")]
    NoConfigDir,
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Where downloaded tools are unpacked. Falls back to the user data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<Url>,
    #[serde(default)]
    pub defaults: Defaults,
}

// root
// - /upkg
//   config.toml
pub struct ConfigApi {
    root: PathBuf,
}

impl ConfigApi {
    pub const APP_DIR: &str = "upkg";
    const CONFIG_FILE: &str = "config.toml";
    const ENV_PREFIX: &str = "UPKG_";
    const CONFIG_DIR_ENV: &str = "UPKG_CONFIG_DIR";

    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// `UPKG_CONFIG_DIR` if set, otherwise `<user config>/upkg`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let root = match env::var_os(Self::CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dir::config_home()
                .ok_or(ConfigError::NoConfigDir)?
                .join(Self::APP_DIR),
        };
        Ok(Self::new(&root))
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(Self::CONFIG_FILE)
    }

    /// Defaults, then the config file, then `UPKG_*` environment variables.
    /// Nested keys use a double underscore: `UPKG_DEFAULTS__ORGANIZATION`.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let fig = self
            .file_figment()
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));
        Ok(fig.extract()?)
    }

    /// Only what is persisted on disk, without environment overrides.
    pub fn load_file(&self) -> Result<Settings, ConfigError> {
        Ok(self.file_figment().extract()?)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let path = self.path();
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.clone(),
            source,
        };
        let content = toml::to_string_pretty(settings)?;
        fs::create_dir_all(&self.root).map_err(write_err)?;
        fs::write(&path, content).map_err(write_err)?;
        Ok(())
    }

    fn file_figment(&self) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(self.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let api = ConfigApi::new(temp.path());
        assert_eq!(api.load_file().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let api = ConfigApi::new(&temp.path().join("nested"));
        let settings = Settings {
            tools_dir: Some(PathBuf::from("/opt/upkg/tools")),
            proxies: Vec::new(),
            defaults: Defaults {
                organization: Some("https://dev.azure.com/contoso/".to_string()),
            },
        };

        api.save(&settings).unwrap();
        assert!(api.path().exists());
        assert_eq!(api.load_file().unwrap(), settings);
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [defaults]
                organization = "https://dev.azure.com/from-file/"
                "#,
            )?;
            jail.set_env("UPKG_DEFAULTS__ORGANIZATION", "https://dev.azure.com/from-env/");
            jail.set_env("UPKG_TOOLS_DIR", "/tmp/upkg-tools");

            let api = ConfigApi::new(jail.directory());
            let settings = api.load().map_err(|e| e.to_string())?;
            assert_eq!(
                settings.defaults.organization.as_deref(),
                Some("https://dev.azure.com/from-env/")
            );
            assert_eq!(settings.tools_dir, Some(PathBuf::from("/tmp/upkg-tools")));

            let on_disk = api.load_file().map_err(|e| e.to_string())?;
            assert_eq!(
                on_disk.defaults.organization.as_deref(),
                Some("https://dev.azure.com/from-file/")
            );
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("config.toml"), "defaults = 3").unwrap();
        let api = ConfigApi::new(temp.path());
        assert!(matches!(api.load_file(), Err(ConfigError::Figment(_))));
    }
}
