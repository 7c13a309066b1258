//! The shared output tree: layout creation and read-only introspection.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Subdirectories the renderer expects under the output root.
pub const MEDIA_SUBDIRS: &[&str] = &["videos", "images", "texts", "Tex"];

/// Create the output root and its kind subdirectories. Idempotent.
pub fn ensure_layout(root: &Path) -> io::Result<()> {
    for sub in MEDIA_SUBDIRS {
        fs::create_dir_all(root.join(sub))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaInfo {
    pub media_directory: PathBuf,
    pub file_count: usize,
    pub mp4_count: usize,
    pub all_files: Vec<String>,
    pub mp4_files: Vec<String>,
}

/// Root-relative path with forward slashes regardless of host separator.
pub fn relative_url_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

pub fn media_info(root: &Path) -> io::Result<MediaInfo> {
    let media_directory = if root.exists() {
        fs::canonicalize(root)?
    } else {
        std::env::current_dir()?.join(root)
    };

    let mut all_files = Vec::new();
    let mut mp4_files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let Some(rel) = relative_url_path(root, entry.path()) else {
            continue;
        };
        if entry.path().extension().is_some_and(|ext| ext == "mp4") {
            mp4_files.push(rel.clone());
        }
        all_files.push(rel);
    }

    Ok(MediaInfo {
        media_directory,
        file_count: all_files.len(),
        mp4_count: mp4_files.len(),
        all_files,
        mp4_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        ensure_layout(dir.path()).unwrap();
        ensure_layout(dir.path()).unwrap();
        for sub in MEDIA_SUBDIRS {
            assert!(dir.path().join(sub).is_dir());
        }
    }

    #[test]
    fn info_counts_files_and_videos() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos/animation_code/720p30");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("abc.mp4"), b"v").unwrap();
        fs::create_dir_all(dir.path().join("texts")).unwrap();
        fs::write(dir.path().join("texts/note.txt"), b"t").unwrap();

        let info = media_info(dir.path()).unwrap();
        assert_eq!(info.file_count, 2);
        assert_eq!(info.mp4_count, 1);
        assert_eq!(info.mp4_files, vec!["videos/animation_code/720p30/abc.mp4"]);
        assert!(info.all_files.contains(&"texts/note.txt".to_string()));
    }

    #[test]
    fn info_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let info = media_info(&dir.path().join("nope")).unwrap();
        assert_eq!(info.file_count, 0);
        assert!(info.all_files.is_empty());
    }
}
