use std::env;
use std::fmt;

use thiserror::Error;

use crate::org::Organization;

/// Environment variable holding the personal access token.
pub const PAT_ENV: &str = "AZURE_DEVOPS_EXT_PAT";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(
        "no credentials found for {organization}; set AZURE_DEVOPS_EXT_PAT to a personal access token with Packaging (read & write) scope"
    )]
    Missing { organization: String },
}

/// A personal access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The token from [`PAT_ENV`], if one is set and not blank.
    pub fn from_env() -> Option<Self> {
        env::var(PAT_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(|token| Self::new(token.trim()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"***").finish()
    }
}

pub trait CredentialSource {
    fn credential(&self, organization: &Organization) -> Result<Credential, CredentialError>;
}

/// Reads the token from [`PAT_ENV`] at the moment it is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn credential(&self, organization: &Organization) -> Result<Credential, CredentialError> {
        Credential::from_env().ok_or_else(|| CredentialError::Missing {
            organization: organization.to_string(),
        })
    }
}

impl CredentialSource for Credential {
    fn credential(&self, _organization: &Organization) -> Result<Credential, CredentialError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let c = Credential::new("super-secret");
        let printed = format!("{c:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_static_credential_source() {
        let org = Organization::parse("https://dev.azure.com/contoso").unwrap();
        let c = Credential::new("pat");
        assert_eq!(c.credential(&org).unwrap().token(), "pat");
    }

    #[test]
    fn test_missing_names_variable() {
        let err = CredentialError::Missing {
            organization: "https://dev.azure.com/contoso".to_string(),
        };
        assert!(err.to_string().contains(PAT_ENV));
    }
}
