//! Atomic placement of extracted tool directories.
//!
//! A tool is unpacked into a staging directory next to its final location
//! and moved into place with a single rename, so a half written install is
//! never visible under the final name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("staging path does not exist: {0}")]
    StagingNotFound(PathBuf),

    #[error("destination has no parent directory: {0}")]
    DestinationParentNotFound(PathBuf),

    #[error("failed to create parent directory {0}: {1}")]
    CreateParentFailed(PathBuf, #[source] io::Error),

    #[error("failed to move {from} into {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy into {0}: {1}")]
    CopyFailed(PathBuf, #[source] io::Error),

    #[error("failed to mark {0} executable: {1}")]
    Permissions(PathBuf, #[source] io::Error),
}

/// What [`install_dir`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Installed,
    /// Another process finished the same install first; its copy was kept.
    AlreadyPresent,
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), io::Error> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Move a fully populated `staging` directory to `dest`.
pub fn install_dir(staging: &Path, dest: &Path) -> Result<Placement, InstallError> {
    if !staging.is_dir() {
        return Err(InstallError::StagingNotFound(staging.to_path_buf()));
    }

    let parent = dest
        .parent()
        .ok_or_else(|| InstallError::DestinationParentNotFound(dest.to_path_buf()))?;
    fs::create_dir_all(parent)
        .map_err(|e| InstallError::CreateParentFailed(parent.to_path_buf(), e))?;

    if dest.exists() {
        debug!(dest = %dest.display(), "install target already present");
        let _ = fs::remove_dir_all(staging);
        return Ok(Placement::AlreadyPresent);
    }

    match fs::rename(staging, dest) {
        Ok(()) => Ok(Placement::Installed),
        // Lost a race with a concurrent install of the same version.
        Err(_) if dest.exists() => {
            let _ = fs::remove_dir_all(staging);
            Ok(Placement::AlreadyPresent)
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("staging is on another filesystem, copying");
            if let Err(e) = copy_dir_all(staging, dest) {
                let _ = fs::remove_dir_all(dest);
                return Err(InstallError::CopyFailed(dest.to_path_buf(), e));
            }
            let _ = fs::remove_dir_all(staging);
            Ok(Placement::Installed)
        }
        Err(source) => Err(InstallError::RenameFailed {
            from: staging.to_path_buf(),
            to: dest.to_path_buf(),
            source,
        }),
    }
}

/// Add execute bits for user, group and other. No-op off Unix.
pub fn set_executable(path: &Path) -> Result<(), InstallError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| InstallError::Permissions(path.to_path_buf(), e))?
            .permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(path, perms)
            .map_err(|e| InstallError::Permissions(path.to_path_buf(), e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_dirs() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let staging = temp.path().join(".staging");
        let dest = temp.path().join("tools").join("ArtifactTool_Linux_x86_64_1.0.0");
        (temp, staging, dest)
    }

    fn create_file(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_install_dir_moves_tree() {
        let (_temp, staging, dest) = setup_test_dirs();
        create_file(&staging.join("ArtifactTool"), b"bin");
        create_file(&staging.join("lib").join("a.dll"), b"lib");

        assert_eq!(install_dir(&staging, &dest).unwrap(), Placement::Installed);
        assert!(!staging.exists());
        assert_eq!(fs::read(dest.join("ArtifactTool")).unwrap(), b"bin");
        assert_eq!(fs::read(dest.join("lib").join("a.dll")).unwrap(), b"lib");
    }

    #[test]
    fn test_install_dir_keeps_existing() {
        let (_temp, staging, dest) = setup_test_dirs();
        create_file(&dest.join("ArtifactTool"), b"old");
        create_file(&staging.join("ArtifactTool"), b"new");

        assert_eq!(
            install_dir(&staging, &dest).unwrap(),
            Placement::AlreadyPresent
        );
        assert!(!staging.exists());
        assert_eq!(fs::read(dest.join("ArtifactTool")).unwrap(), b"old");
    }

    #[test]
    fn test_install_dir_missing_staging() {
        let (_temp, staging, dest) = setup_test_dirs();
        let result = install_dir(&staging, &dest);
        assert!(matches!(result, Err(InstallError::StagingNotFound(_))));
    }

    #[test]
    fn test_copy_dir_all() {
        let (temp, staging, _) = setup_test_dirs();
        create_file(&staging.join("x").join("y.txt"), b"y");
        let copy = temp.path().join("copy");
        copy_dir_all(&staging, &copy).unwrap();
        assert_eq!(fs::read(copy.join("x").join("y.txt")).unwrap(), b"y");
    }

    #[cfg(unix)]
    #[test]
    fn test_set_executable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("ArtifactTool");
        create_file(&file, b"#!/bin/sh\n");
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        set_executable(&file).unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
