//! Filesystem helpers: crash-safe writes and root-level file listing.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use walkdir::WalkDir;

use crate::error::GitletResult;

/// Write data to a file atomically using temp-file-then-rename.
///
/// On POSIX, `rename()` within the same filesystem is atomic: either
/// the old file or the new file is visible, never a partial write. The
/// temp file is synced before renaming so the data is durable on disk.
pub fn atomic_write(path: &Path, data: &[u8]) -> GitletResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Names of the plain files directly under `dir`, sorted by name.
///
/// Subdirectories are not traversed and do not appear in the result.
pub fn plain_filenames(dir: &Path) -> GitletResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Delete the working-directory file `name` if it is a plain file.
///
/// Never touches directories and never recurses; a missing file is
/// not an error.
pub fn restricted_delete(root: &Path, name: &str) -> GitletResult<()> {
    let path = root.join(name);
    if path.is_file() {
        fs::remove_file(&path)?;
    }
    Ok(())
}
