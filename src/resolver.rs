use crate::error::{FortuneError, Result};
use crate::extract::{extract, Fragment};
use crate::index::locate_random_fragment;
use crate::path_list::{choose_random_path, split_path_list};
use crate::scanner::{choose_random_index_file, list_index_files};
use crate::{DEFAULT_FORTUNE_DIR, FORTUNE_PATH_VAR, INDEX_SUFFIX};
use rand::Rng;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Places to look for fortunes when no path is given, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallbacks {
    pub env_paths: Option<String>,
    pub default_dir: PathBuf,
}

impl Fallbacks {
    pub fn from_env() -> Self {
        Fallbacks {
            env_paths: env::var(FORTUNE_PATH_VAR).ok(),
            default_dir: PathBuf::from(DEFAULT_FORTUNE_DIR),
        }
    }

    /// Returns the first fallback that holds at least one fortune.
    ///
    /// Entries of the environment list that hold none are skipped; the pick
    /// is uniform over the rest.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PathBuf> {
        if let Some(list) = self.env_paths.as_deref().filter(|l| !l.is_empty()) {
            let mut usable: Vec<PathBuf> = split_path_list(list)
                .into_iter()
                .map(PathBuf::from)
                .filter(|p| is_usable(p))
                .collect();
            if !usable.is_empty() {
                let i = rng.gen_range(0..usable.len());
                return Ok(usable.swap_remove(i));
            }
            debug!("no usable entry in {}", FORTUNE_PATH_VAR);
        }
        if is_usable(&self.default_dir) {
            return Ok(self.default_dir.clone());
        }
        Err(FortuneError::NoFortuneSourceAvailable)
    }
}

fn is_usable(path: &Path) -> bool {
    if path.is_dir() {
        list_index_files(path).map_or(false, |files| !files.is_empty())
    } else {
        index_path_for_file(path).is_file()
    }
}

/// `fortunes` -> `fortunes.dat`
pub fn index_path_for_file(path: &Path) -> PathBuf {
    let mut index: OsString = path.as_os_str().to_owned();
    index.push(INDEX_SUFFIX);
    PathBuf::from(index)
}

/// `fortunes.dat` -> `fortunes`
pub fn source_path_for(index_path: &Path) -> PathBuf {
    index_path.with_extension("")
}

/// Finds the index file for a fortune file or a directory of them.
pub fn index_path_for<R: Rng + ?Sized>(path: &Path, rng: &mut R) -> Result<PathBuf> {
    if path.is_dir() {
        choose_random_index_file(path, rng)
    } else {
        Ok(index_path_for_file(path))
    }
}

/// Picks and reads one fortune.
///
/// `input` may be a fortune file, a directory, or a colon separated list of
/// either. Without it the `fallbacks` are consulted.
pub fn resolve_fortune<R: Rng + ?Sized>(
    input: Option<&str>,
    fallbacks: &Fallbacks,
    rng: &mut R,
) -> Result<Fragment> {
    let root = match input {
        Some(list) => PathBuf::from(choose_random_path(list, rng)?),
        None => fallbacks.choose(rng)?,
    };
    let index_path = index_path_for(&root, rng)?;
    debug!("using {}", index_path.display());
    let location = locate_random_fragment(&index_path, rng)?;
    extract(&source_path_for(&index_path), &location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;

    fn write_v2(dir: &Path, name: &str, fortunes: &[&str]) {
        let mut text = String::new();
        let mut offsets = vec![0u32];
        for f in fortunes {
            text.push_str(f);
            text.push_str("\n%\n");
            offsets.push(text.len() as u32);
        }
        let longest = fortunes.iter().map(|f| f.len() as u32 + 1).max().unwrap_or(0);
        let mut dat = Vec::new();
        for field in [2, fortunes.len() as u32, longest, 0, 0] {
            dat.extend_from_slice(&field.to_be_bytes());
        }
        dat.extend_from_slice(&[b'%', 0, 0, 0]);
        for off in offsets {
            dat.extend_from_slice(&off.to_be_bytes());
        }
        fs::write(dir.join(name), text).unwrap();
        fs::write(dir.join(format!("{}.dat", name)), dat).unwrap();
    }

    #[test]
    fn test_suffix_paths() {
        assert_eq!(
            index_path_for_file(Path::new("/usr/share/fortunes/wisdom")),
            PathBuf::from("/usr/share/fortunes/wisdom.dat")
        );
        assert_eq!(
            index_path_for_file(Path::new("a.b")),
            PathBuf::from("a.b.dat")
        );
        assert_eq!(source_path_for(Path::new("a.b.dat")), PathBuf::from("a.b"));
        assert_eq!(
            source_path_for(Path::new("dir/wisdom.dat")),
            PathBuf::from("dir/wisdom")
        );
    }

    #[test]
    fn test_resolve_file() {
        let dir = tempfile::tempdir().unwrap();
        write_v2(dir.path(), "only", &["the one"]);
        let input = dir.path().join("only");
        let mut rng = StdRng::seed_from_u64(5);
        let frag = resolve_fortune(
            Some(input.to_str().unwrap()),
            &Fallbacks::from_env(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(frag.as_bytes(), b"the one");
    }

    #[test]
    fn test_resolve_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_v2(dir.path(), "a", &["alpha"]);
        write_v2(dir.path(), "b", &["beta"]);
        fs::write(dir.path().join("notes.txt"), "gamma\n%\n").unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let input = dir.path().to_str().unwrap();
        for _ in 0..20 {
            let frag = resolve_fortune(Some(input), &Fallbacks::from_env(), &mut rng).unwrap();
            assert!(frag.as_bytes() == b"alpha" || frag.as_bytes() == b"beta");
        }
    }

    #[test]
    fn test_resolve_path_list() {
        let dir = tempfile::tempdir().unwrap();
        write_v2(dir.path(), "a", &["alpha"]);
        write_v2(dir.path(), "b", &["beta"]);
        let list = format!(
            "{}:{}",
            dir.path().join("a").display(),
            dir.path().join("b").display()
        );
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..40 {
            let frag = resolve_fortune(Some(&list), &Fallbacks::from_env(), &mut rng).unwrap();
            seen.insert(frag.into_bytes());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        write_v2(dir.path(), "env", &["from env"]);
        let default_dir = tempfile::tempdir().unwrap();
        write_v2(default_dir.path(), "def", &["from default"]);
        let mut rng = StdRng::seed_from_u64(4);

        let fallbacks = Fallbacks {
            env_paths: Some(dir.path().join("env").display().to_string()),
            default_dir: default_dir.path().to_path_buf(),
        };
        let frag = resolve_fortune(None, &fallbacks, &mut rng).unwrap();
        assert_eq!(frag.as_bytes(), b"from env");

        // An unusable environment entry falls through to the default
        let fallbacks = Fallbacks {
            env_paths: Some(dir.path().join("missing").display().to_string()),
            default_dir: default_dir.path().to_path_buf(),
        };
        let frag = resolve_fortune(None, &fallbacks, &mut rng).unwrap();
        assert_eq!(frag.as_bytes(), b"from default");

        let fallbacks = Fallbacks {
            env_paths: Some(String::new()),
            default_dir: default_dir.path().to_path_buf(),
        };
        let frag = resolve_fortune(None, &fallbacks, &mut rng).unwrap();
        assert_eq!(frag.as_bytes(), b"from default");
    }

    #[test]
    fn test_fallbacks_skip_unusable_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_v2(dir.path(), "good", &["kept"]);
        fs::create_dir(dir.path().join("bare")).unwrap();
        let list = format!(
            "{}:{}:{}",
            dir.path().join("missing").display(),
            dir.path().join("bare").display(),
            dir.path().join("good").display()
        );
        let fallbacks = Fallbacks {
            env_paths: Some(list),
            default_dir: dir.path().join("nowhere"),
        };
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let frag = resolve_fortune(None, &fallbacks, &mut rng).unwrap();
            assert_eq!(frag.as_bytes(), b"kept");
        }
    }

    #[test]
    fn test_empty_default_dir_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), "nothing here\n").unwrap();
        let fallbacks = Fallbacks {
            env_paths: None,
            default_dir: dir.path().to_path_buf(),
        };
        let mut rng = StdRng::seed_from_u64(4);
        let res = resolve_fortune(None, &fallbacks, &mut rng);
        assert!(matches!(res, Err(FortuneError::NoFortuneSourceAvailable)));
    }

    #[test]
    fn test_no_fortunes_installed() {
        let dir = tempfile::tempdir().unwrap();
        let fallbacks = Fallbacks {
            env_paths: None,
            default_dir: dir.path().join("nowhere"),
        };
        let mut rng = StdRng::seed_from_u64(4);
        let res = resolve_fortune(None, &fallbacks, &mut rng);
        assert!(matches!(res, Err(FortuneError::NoFortuneSourceAvailable)));
    }

    #[test]
    fn test_resolve_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain"), "no index\n%\n").unwrap();
        let input = dir.path().join("plain");
        let mut rng = StdRng::seed_from_u64(4);
        let res = resolve_fortune(
            Some(input.to_str().unwrap()),
            &Fallbacks::from_env(),
            &mut rng,
        );
        assert!(matches!(res, Err(FortuneError::IndexOpen { .. })));
    }
}
