//! Publish and download Universal Packages through the Azure DevOps
//! artifact tool.
//!
//! The heavy lifting (chunking, deduplication, transfer) happens inside the
//! external `ArtifactTool` executable. This crate decides which organization
//! to talk to, makes sure a matching tool is installed, runs it with the
//! right arguments and turns service failures into a single user facing
//! error.

pub use error::{Error, Result, UserError};

pub mod credential;
mod error;
pub mod org;
pub mod service;
pub mod tool;
pub mod universal;
