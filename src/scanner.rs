use crate::error::{FortuneError, Result};
use crate::INDEX_SUFFIX;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

fn is_index_file(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.len() > INDEX_SUFFIX.len() && name.ends_with(INDEX_SUFFIX)
}

/// Lists the `.dat` files directly inside `dir`, sorted by name.
///
/// Entries are matched by name only; links are not followed, so a dangling
/// link in the directory is just another name.
pub fn list_index_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| FortuneError::DirectoryUnreadable {
            dir: dir.to_path_buf(),
            source: e,
        })?;
        if is_index_file(&entry) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Picks one `.dat` file from `dir` uniformly at random.
pub fn choose_random_index_file<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Result<PathBuf> {
    let mut files = list_index_files(dir)?;
    if files.is_empty() {
        return Err(FortuneError::NoIndexFiles {
            dir: dir.to_path_buf(),
        });
    }
    debug!("{} index files in {}", files.len(), dir.display());
    let i = rng.gen_range(0..files.len());
    Ok(files.swap_remove(i))
}
