//! Native OS utilities the host exposes as opaque services.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("trash error: {0}")]
    Trash(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Move a file or directory to the user's trash (freedesktop layout:
/// `Trash/files/` plus a `Trash/info/` entry). Returns the trashed path.
pub fn move_to_trash(path: &Path) -> Result<PathBuf, PlatformError> {
    let trash_root = dirs::data_dir()
        .ok_or_else(|| PlatformError::Trash("no data directory".into()))?
        .join("Trash");
    move_to_trash_in(path, &trash_root)
}

fn move_to_trash_in(path: &Path, trash_root: &Path) -> Result<PathBuf, PlatformError> {
    if !path.exists() {
        return Err(PlatformError::Trash(format!(
            "no such path: {}",
            path.display()
        )));
    }
    let files_dir = trash_root.join("files");
    let info_dir = trash_root.join("info");
    std::fs::create_dir_all(&files_dir)?;
    std::fs::create_dir_all(&info_dir)?;

    let name = path
        .file_name()
        .ok_or_else(|| PlatformError::Trash(format!("unusable path: {}", path.display())))?
        .to_string_lossy()
        .to_string();

    // Pick a free name in the trash: "name", then "name.1", "name.2", ...
    let mut candidate = name.clone();
    let mut counter = 0u32;
    while files_dir.join(&candidate).exists() {
        counter += 1;
        candidate = format!("{name}.{counter}");
    }
    let target = files_dir.join(&candidate);

    let deleted_at = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
    let info = format!(
        "[Trash Info]\nPath={}\nDeletionDate={}\n",
        path.display(),
        deleted_at
    );
    std::fs::write(info_dir.join(format!("{candidate}.trashinfo")), info)?;

    // Same-filesystem rename first; fall back to copy + remove for files.
    if std::fs::rename(path, &target).is_err() {
        std::fs::copy(path, &target)?;
        std::fs::remove_file(path)?;
    }

    info!(from = %path.display(), to = %target.display(), "moved to trash");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "atrium-native-test-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn trashes_a_file_with_info_entry() {
        let dir = scratch_dir("basic");
        let victim = dir.join("600x200_copy.jpg");
        std::fs::write(&victim, b"jpeg bytes").unwrap();

        let trash = dir.join("Trash");
        let target = move_to_trash_in(&victim, &trash).unwrap();

        assert!(!victim.exists());
        assert!(target.exists());
        let info = std::fs::read_to_string(trash.join("info/600x200_copy.jpg.trashinfo")).unwrap();
        assert!(info.starts_with("[Trash Info]"));
        assert!(info.contains("600x200_copy.jpg"));
    }

    #[test]
    fn collisions_get_numbered_names() {
        let dir = scratch_dir("collide");
        let trash = dir.join("Trash");

        for expected in ["same.txt", "same.txt.1"] {
            let victim = dir.join("same.txt");
            std::fs::write(&victim, b"x").unwrap();
            let target = move_to_trash_in(&victim, &trash).unwrap();
            assert_eq!(target.file_name().unwrap().to_str().unwrap(), expected);
        }
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = scratch_dir("missing");
        let err = move_to_trash_in(&dir.join("nope.txt"), &dir.join("Trash")).unwrap_err();
        assert!(matches!(err, PlatformError::Trash(_)));
    }
}
