//! Artifact writing: temp file in the destination directory, then rename.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Write `bytes` to `path` so readers never observe a half-written file.
///
/// Any existing file is replaced. On Unix the result has mode `0644`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    set_output_permissions(tmp.as_file())?;
    tmp.persist(path)?;

    log::debug!("wrote '{}' ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(unix)]
fn set_output_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_output_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
