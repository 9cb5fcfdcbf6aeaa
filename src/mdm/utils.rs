use crate::error::GraphitiError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Get the user's home directory
pub fn home_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Ok(userprofile) = std::env::var("USERPROFILE")
            && !userprofile.is_empty()
        {
            return PathBuf::from(userprofile);
        }

        if let (Ok(home_drive), Ok(home_path)) =
            (std::env::var("HOMEDRIVE"), std::env::var("HOMEPATH"))
            && !home_drive.is_empty()
            && !home_path.is_empty()
        {
            return PathBuf::from(format!("{}{}", home_drive, home_path));
        }

        if let Ok(home) = std::env::var("HOME")
            && !home.is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(windows))]
    {
        if let Ok(home) = std::env::var("HOME")
            && !home.is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Write data to a file atomically (write to temp, then rename).
/// If the path is a symlink, writes to the target file (preserving the symlink).
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), GraphitiError> {
    let target_path = if path.is_symlink() {
        fs::canonicalize(path)?
    } else {
        path.to_path_buf()
    };

    let tmp_path = target_path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, &target_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_round_trips_through_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        write_atomic(&path, b"world").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"world");
    }

    #[test]
    fn home_dir_is_nonempty() {
        assert!(!home_dir().as_os_str().is_empty());
    }
}
