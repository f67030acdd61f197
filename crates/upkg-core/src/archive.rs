//! Zip extraction for downloaded tool bundles.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive is corrupted: {0}")]
    Corrupted(#[from] zip::result::ZipError),

    #[error("zip-slip attack detected: entry '{entry}' resolves to '{resolved}'")]
    ZipSlip { entry: PathBuf, resolved: PathBuf },

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Default)]
pub struct ExtractReport {
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Normalize separators and resolve `.`/`..` without touching the disk.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::CurDir => {}
        }
    }

    result
}

/// Resolve an archive entry name under `base`, rejecting anything that
/// would land outside of it.
fn sanitize_entry(name: &str, base: &Path) -> Result<PathBuf> {
    let entry = PathBuf::from(name.replace('\\', "/"));
    let escapes = entry.is_absolute()
        || entry.has_root()
        || entry
            .components()
            .try_fold(0usize, |depth, c| match c {
                Component::ParentDir => depth.checked_sub(1),
                Component::Normal(_) => Some(depth + 1),
                _ => Some(depth),
            })
            .is_none();

    let resolved = normalize_path(&base.join(&entry));
    if escapes || !resolved.starts_with(base) {
        return Err(ArchiveError::ZipSlip { entry, resolved });
    }
    Ok(resolved)
}

pub fn extract_zip_file(archive: &Path, dest: &Path) -> Result<ExtractReport> {
    let file = File::open(archive).map_err(|source| ArchiveError::ExtractionFailed {
        path: archive.to_path_buf(),
        source,
    })?;
    extract_zip(file, dest)
}

pub fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<ExtractReport> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut report = ExtractReport::default();
    let fail = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ArchiveError::ExtractionFailed { path, source }
    };

    fs::create_dir_all(dest).map_err(fail(dest))?;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let target = sanitize_entry(file.name(), dest)?;
        trace!(entry = file.name(), "extract");

        if file.is_dir() {
            fs::create_dir_all(&target).map_err(fail(&target))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(fail(parent))?;
        }
        let mut out = File::create(&target).map_err(fail(&target))?;
        report.total_bytes += io::copy(&mut file, &mut out).map_err(fail(&target))?;
        report.entry_count += 1;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .map_err(fail(&target))?;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().unix_permissions(0o755);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn extract_nested_entries() {
        let temp = tempfile::tempdir().unwrap();
        let zip = build_zip(&[("ArtifactTool", b"bin"), ("lib/native.so", b"so")]);

        let report = extract_zip(zip, temp.path()).unwrap();
        assert_eq!(report.entry_count, 2);
        assert_eq!(report.total_bytes, 5);
        assert_eq!(fs::read(temp.path().join("ArtifactTool")).unwrap(), b"bin");
        assert_eq!(fs::read(temp.path().join("lib/native.so")).unwrap(), b"so");
    }

    #[cfg(unix)]
    #[test]
    fn extract_keeps_exec_bits() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::tempdir().unwrap();
        extract_zip(build_zip(&[("ArtifactTool", b"bin")]), temp.path()).unwrap();
        let mode = fs::metadata(temp.path().join("ArtifactTool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn extract_rejects_zip_slip() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("out");
        let zip = build_zip(&[("../evil.txt", b"x")]);

        let result = extract_zip(zip, &base);
        assert!(matches!(result, Err(ArchiveError::ZipSlip { .. })));
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn sanitize_accepts_inner_parent_dirs() {
        let base = Path::new("/opt/tools");
        let resolved = sanitize_entry("bin/../lib/a.so", base).unwrap();
        assert_eq!(resolved, Path::new("/opt/tools/lib/a.so"));
    }

    #[test]
    fn sanitize_rejects_absolute() {
        let base = Path::new("/opt/tools");
        assert!(matches!(
            sanitize_entry("/etc/passwd", base),
            Err(ArchiveError::ZipSlip { .. })
        ));
    }

    #[test]
    fn path_normalization() {
        let result = normalize_path(Path::new("foo//bar/baz/../qux"));
        assert_eq!(result, Path::new("foo/bar/qux"));
    }

    #[test]
    fn corrupted_archive() {
        let temp = tempfile::tempdir().unwrap();
        let result = extract_zip(Cursor::new(b"not a zip".to_vec()), temp.path());
        assert!(matches!(result, Err(ArchiveError::Corrupted(_))));
    }
}
