use thiserror::Error;

use crate::credential::CredentialError;
use crate::org::OrganizationError;
use crate::service::ServiceError;
use crate::tool::ToolError;

/// A failure the user can act on. Carries only the message of whatever
/// went wrong with the service, the credentials or the organization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserError {
    message: String,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ServiceError> for UserError {
    fn from(e: ServiceError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<OrganizationError> for UserError {
    fn from(e: OrganizationError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<CredentialError> for UserError {
    fn from(e: CredentialError) -> Self {
        Self::new(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Tool(ToolError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ToolError> for Error {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Service(e) => Error::User(e.into()),
            ToolError::Credential(e) => Error::User(e.into()),
            ToolError::Organization(e) => Error::User(e.into()),
            other => Error::Tool(other),
        }
    }
}

impl From<OrganizationError> for Error {
    fn from(e: OrganizationError) -> Self {
        Error::User(e.into())
    }
}

impl From<ServiceError> for Error {
    fn from(e: ServiceError) -> Self {
        Error::User(e.into())
    }
}

impl From<CredentialError> for Error {
    fn from(e: CredentialError) -> Self {
        Error::User(e.into())
    }
}
