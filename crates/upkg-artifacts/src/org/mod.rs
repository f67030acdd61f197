//! Deciding which Azure DevOps organization a command targets.
//!
//! The order is fixed: an explicit `--organization` wins outright and no
//! detector is consulted; otherwise, with detection on, the Git remote of
//! the working directory is inspected; finally the configured default is
//! used. Running out of options is an error, never an empty value.

mod git;
mod remote;

pub use git::GitRemoteDetector;
pub use remote::{RemoteKind, parse_remote};

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error(
        "--organization must be specified. The value should be the URI of your Azure DevOps organization, \
         for example: https://dev.azure.com/MyOrganization/. You can set a default value by running: \
         upkg configure --organization https://dev.azure.com/MyOrganization/. For auto detection to work \
         (--detect on), you must be in a local Git directory that has a \"remote\" referencing an \
         Azure DevOps repository."
    )]
    NotSpecified,

    #[error("'{value}' is not a valid organization URL: {reason}")]
    Invalid { value: String, reason: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// The organization URL as the user (or detection) supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Organization {
    uri: String,
    #[serde(skip)]
    base: Url,
}

impl Organization {
    pub fn parse(value: &str) -> Result<Self, OrganizationError> {
        let uri = value.trim().to_string();
        let invalid = |reason: String| OrganizationError::Invalid {
            value: value.to_string(),
            reason,
        };

        let mut base = Url::parse(&uri).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }
        if base.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { uri, base })
    }

    /// Exactly what was supplied; this is what the artifact tool receives.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Resolve a REST path such as `_apis/clienttools/ArtifactTool/release`
    /// under the organization.
    pub fn api_url(&self, path: &str) -> Result<Url, OrganizationError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| OrganizationError::Invalid {
                value: self.uri.clone(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Whether the organization may be inferred from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detect {
    #[default]
    On,
    Off,
}

impl Detect {
    pub fn enabled(self) -> bool {
        self == Detect::On
    }
}

impl FromStr for Detect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(Detect::On),
            "off" | "false" | "no" | "0" => Ok(Detect::Off),
            other => Err(format!("expected 'on' or 'off', got '{other}'")),
        }
    }
}

impl fmt::Display for Detect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detect::On => f.write_str("on"),
            Detect::Off => f.write_str("off"),
        }
    }
}

/// Infers an organization from the surroundings.
pub trait Detector {
    fn detect(&self) -> Result<Option<Organization>, OrganizationError>;
}

/// Never finds anything. For callers that disable detection wholesale.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDetection;

impl Detector for NoDetection {
    fn detect(&self) -> Result<Option<Organization>, OrganizationError> {
        Ok(None)
    }
}

/// Turns the optional `--organization`/`--detect` pair into a concrete
/// organization.
pub trait OrganizationResolver {
    fn resolve(&self, explicit: Option<&str>, detect: Detect)
    -> Result<Organization, OrganizationError>;
}

/// Explicit value, then `detector`, then the configured default.
pub struct DetectingResolver<D> {
    detector: D,
    default: Option<String>,
}

impl<D: Detector> DetectingResolver<D> {
    pub fn new(detector: D, default: Option<String>) -> Self {
        Self { detector, default }
    }
}

impl<D: Detector> OrganizationResolver for DetectingResolver<D> {
    fn resolve(
        &self,
        explicit: Option<&str>,
        detect: Detect,
    ) -> Result<Organization, OrganizationError> {
        if let Some(org) = explicit.filter(|o| !o.trim().is_empty()) {
            return Organization::parse(org);
        }

        if detect.enabled() {
            if let Some(org) = self.detector.detect()? {
                debug!(organization = %org, "detected organization");
                return Ok(org);
            }
        }

        match self.default.as_deref().filter(|o| !o.trim().is_empty()) {
            Some(org) => {
                debug!(organization = org, "using configured default organization");
                Organization::parse(org)
            }
            None => Err(OrganizationError::NotSpecified),
        }
    }
}
