//! Finding what the renderer wrote.
//!
//! The tool picks its own subdirectories (script name, resolution, fps), so the
//! caller only knows the output name. Lookup is exact-name-first, then the most
//! recently modified file of the right type. The fallback is best-effort: with
//! several runs sharing one root it can return another run's file.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::media::relative_url_path;
use crate::types::OutputId;

/// Public URL (`<prefix>/<root-relative path>`) of the artifact for `id`, if any.
pub fn locate_artifact(root: &Path, id: &OutputId, extension: &str, prefix: &str) -> Option<String> {
    let path = find_artifact_path(root, id, extension)?;
    let rel = relative_url_path(root, &path)?;
    Some(format!("{}/{rel}", prefix.trim_end_matches('/')))
}

pub fn find_artifact_path(root: &Path, id: &OutputId, extension: &str) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == extension))
        .map(|e| e.into_path())
        .collect();

    let by_name = candidates.iter().find(|p| {
        p.file_name()
            .is_some_and(|name| name.to_string_lossy().contains(id.as_str()))
    });
    if let Some(found) = by_name {
        log::debug!("artifact {id} found by name at {}", found.display());
        return Some(found.clone());
    }

    let newest = candidates
        .into_iter()
        .max_by_key(|p| modified_at(p).unwrap_or(SystemTime::UNIX_EPOCH))?;
    log::warn!(
        "no artifact named after {id}; falling back to newest .{extension}: {}",
        newest.display()
    );
    Some(newest)
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn finds_nested_file_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos/animation_code/720p30");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("other.mp4"), b"o").unwrap();
        fs::write(nested.join("ab12cd34.mp4"), b"v").unwrap();

        let url = locate_artifact(dir.path(), &OutputId::new("ab12cd34"), "mp4", "/media/");
        assert_eq!(
            url.as_deref(),
            Some("/media/videos/animation_code/720p30/ab12cd34.mp4")
        );
    }

    #[test]
    fn relocating_returns_the_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos/x/480p15");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("run-ff00ff00.mp4"), b"v").unwrap();

        let id = OutputId::new("ff00ff00");
        let first = locate_artifact(dir.path(), &id, "mp4", "/media");
        let second = locate_artifact(dir.path(), &id, "mp4", "/media");
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn falls_back_to_newest_of_type() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.mp4");
        let new = dir.path().join("new.mp4");
        fs::write(&old, b"o").unwrap();
        fs::write(&new, b"n").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let found = find_artifact_path(dir.path(), &OutputId::new("missing"), "mp4").unwrap();
        assert_eq!(found, new);
    }

    #[test]
    fn wrong_extension_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ab12cd34.png"), b"i").unwrap();
        assert!(locate_artifact(dir.path(), &OutputId::new("ab12cd34"), "mp4", "/media").is_none());
    }
}
