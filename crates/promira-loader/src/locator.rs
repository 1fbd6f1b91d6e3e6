//! Shared library search
//!
//! On Windows the loader already looks in the executable's directory and
//! then the current directory, so the bare file name is passed through. The
//! POSIX loaders do neither, so the same order is emulated here before
//! falling back to the default search (`LD_LIBRARY_PATH`, etc).

use std::fs::File;
use std::path::{Path, PathBuf};

/// Platform file name of a vendor library (`promira.so`, `promira.dll`)
///
/// The vendor ships `.so` objects for macOS as well.
pub fn library_file_name(base_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.dll", base_name)
    } else {
        format!("{}.so", base_name)
    }
}

/// First directory holding a readable `name`
pub fn find_in_dirs<I>(name: &Path, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| File::open(candidate).is_ok())
}

/// Directories searched before the OS default: executable dir, then cwd
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::with_capacity(2);
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(dir);
    }
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    dirs
}

/// Computes the name handed to the OS loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    name: PathBuf,
}

impl Locator {
    /// Locate `name`, either a bare file name or an absolute path
    pub fn new(name: impl Into<PathBuf>) -> Self {
        Self { name: name.into() }
    }

    /// Name or path to open
    pub fn search_name(&self) -> PathBuf {
        if cfg!(windows) || self.name.is_absolute() {
            return self.name.clone();
        }
        self.search_name_in(default_search_dirs())
    }

    /// Search the given directories in order, falling back to the bare name
    pub fn search_name_in<I>(&self, dirs: I) -> PathBuf
    where
        I: IntoIterator<Item = PathBuf>,
    {
        if self.name.is_absolute() {
            return self.name.clone();
        }
        match find_in_dirs(&self.name, dirs) {
            Some(path) => {
                log::debug!("Found {} at {}", self.name.display(), path.display());
                path
            }
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "promira-locator-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_file_name() {
        let name = library_file_name("promira");
        if cfg!(windows) {
            assert_eq!(name, "promira.dll");
        } else {
            assert_eq!(name, "promira.so");
        }
    }

    #[test]
    fn test_exe_dir_wins_over_cwd_wins_over_default() {
        let exe_dir = scratch_dir("exe");
        let cwd = scratch_dir("cwd");
        fs::write(exe_dir.join("promira.so"), b"").unwrap();
        fs::write(cwd.join("promira.so"), b"").unwrap();

        let locator = Locator::new("promira.so");
        let dirs = || vec![exe_dir.clone(), cwd.clone()];

        assert_eq!(locator.search_name_in(dirs()), exe_dir.join("promira.so"));

        fs::remove_file(exe_dir.join("promira.so")).unwrap();
        assert_eq!(locator.search_name_in(dirs()), cwd.join("promira.so"));

        fs::remove_file(cwd.join("promira.so")).unwrap();
        assert_eq!(locator.search_name_in(dirs()), PathBuf::from("promira.so"));

        let _ = fs::remove_dir_all(&exe_dir);
        let _ = fs::remove_dir_all(&cwd);
    }

    #[test]
    fn test_absolute_name_is_unmodified() {
        let dir = scratch_dir("abs");
        fs::write(dir.join("promira.so"), b"").unwrap();

        let absolute = std::env::temp_dir().join("elsewhere").join("promira.so");
        let locator = Locator::new(absolute.clone());
        assert_eq!(locator.search_name_in(vec![dir.clone()]), absolute);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = scratch_dir("missing");
        assert_eq!(find_in_dirs(Path::new("promact_is.so"), vec![dir.clone()]), None);
        let _ = fs::remove_dir_all(&dir);
    }
}
