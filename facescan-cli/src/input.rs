//! Discovery of capture images under `root/<Subject>/<Device>/`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use facescan_utils::{RunSettings, has_image_extension};
use log::{debug, info};
use walkdir::WalkDir;

/// Sorted directory entries directly below `dir`.
fn children(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
}

/// Collect every capture image below `root`, in subject, device, file order.
pub fn collect_subject_images(root: &Path, run: &RunSettings) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(
        root.is_dir(),
        "dataset root is not a directory: {}",
        root.display()
    );

    let mut images = Vec::new();
    for subject in children(root).filter(|e| e.file_type().is_dir()) {
        let subject_name = subject.file_name().to_string_lossy();
        if !run.allows_subject(&subject_name) {
            debug!("Skipping subject {subject_name} (not in allow-list)");
            continue;
        }

        for device in &run.device_dirs {
            let device_dir = subject.path().join(device);
            if !device_dir.is_dir() {
                debug!("No {device} directory for {subject_name}");
                continue;
            }

            for entry in children(&device_dir).filter(|e| e.file_type().is_file()) {
                if has_image_extension(entry.path(), &run.extensions) {
                    images.push(entry.into_path());
                } else {
                    debug!("Skipping non-image file {}", entry.path().display());
                }
            }
        }
    }

    info!("Found {} image(s) under {}", images.len(), root.display());
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn walks_subjects_then_devices_in_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "Subject_2/Mobile/b.jpg");
        touch(root, "Subject_2/Camera/z.PNG");
        touch(root, "Subject_1/Mobile/a.jpeg");
        touch(root, "Subject_1/Camera/notes.txt");
        touch(root, "Subject_1/Camera/c.jpg");
        touch(root, "Subject_1/Other/ignored.jpg");
        touch(root, "stray.jpg");

        let images = collect_subject_images(root, &RunSettings::default()).unwrap();
        assert_eq!(
            names(&images, root),
            [
                "Subject_1/Camera/c.jpg",
                "Subject_1/Mobile/a.jpeg",
                "Subject_2/Camera/z.PNG",
                "Subject_2/Mobile/b.jpg",
            ]
        );
    }

    #[test]
    fn allow_list_restricts_subjects() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "Subject_1/Camera/a.jpg");
        touch(root, "Subject_2/Camera/b.jpg");

        let run = RunSettings {
            subjects: Some(vec!["Subject_2".into()]),
            ..Default::default()
        };
        let images = collect_subject_images(root, &run).unwrap();
        assert_eq!(names(&images, root), ["Subject_2/Camera/b.jpg"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(collect_subject_images(&dir.path().join("nope"), &RunSettings::default()).is_err());
    }
}
