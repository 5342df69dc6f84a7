//! Replace-by-rename file writes.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tributary_core::{CoreError, CoreResult};

/// Write `bytes` to `target`, replacing any previous file in one rename.
///
/// The temporary file lives next to the target so the rename never
/// crosses filesystems. On error the previous file is left untouched.
///
/// # Errors
///
/// Returns an IO error if the directory is missing or unwritable
pub fn write_file(target: &Path, bytes: &[u8]) -> CoreResult<()> {
    let dir = parent_dir(target);
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| CoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| CoreError::io(tmp.path(), e))?;
    tmp.persist(target).map_err(|e| CoreError::io(target, e.error))?;
    Ok(())
}

/// Open a temporary file next to `target` for streaming writes; call
/// [`commit`] to move it into place.
///
/// # Errors
///
/// Returns an IO error if the directory is missing or unwritable
pub fn staging_file(target: &Path) -> CoreResult<NamedTempFile> {
    let dir = parent_dir(target);
    NamedTempFile::new_in(dir).map_err(|e| CoreError::io(dir, e))
}

/// Move a staged file over `target`
///
/// # Errors
///
/// Returns an IO error if the rename fails
pub fn commit(staged: NamedTempFile, target: &Path) -> CoreResult<()> {
    staged
        .as_file()
        .sync_all()
        .map_err(|e| CoreError::io(staged.path(), e))?;
    staged
        .persist(target)
        .map_err(|e| CoreError::io(target, e.error))?;
    Ok(())
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
