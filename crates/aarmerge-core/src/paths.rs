//! Per-user aarmerge directories.

use dirs::home_dir;
use std::path::PathBuf;
use tempfile::TempDir;

/// Returns the aarmerge home directory (`AARMERGE_HOME`, else `~/.aarmerge`),
/// or None if the user's home cannot be resolved.
pub fn try_aarmerge_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("AARMERGE_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".aarmerge"))
}

/// Temp path: ~/.aarmerge/tmp
pub fn tmp_path() -> Option<PathBuf> {
    try_aarmerge_home().map(|h| h.join("tmp"))
}

/// Create a scratch directory for unpacking archives.
///
/// Lives under [`tmp_path`] when the home directory is known, otherwise in
/// the system temp directory. Removed when the returned guard drops.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn unpack_tempdir() -> std::io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("aarmerge-unpack-");
    match tmp_path() {
        Some(tmp) => {
            std::fs::create_dir_all(&tmp)?;
            builder.tempdir_in(tmp)
        }
        None => builder.tempdir(),
    }
}
