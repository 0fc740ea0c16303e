//! Shared helpers for CLI integration tests.
use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{ImageBuffer, Rgb};

/// Locate the YOLOv5 face model, if one has been placed in the workspace.
pub fn find_model_path() -> Option<PathBuf> {
    ["models/yolov5_face.onnx", "../models/yolov5_face.onnx"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Write a small gradient image at `root/rel`, creating parent directories.
pub fn write_capture(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = ImageBuffer::from_fn(64, 48, |x, y| {
        let r = ((x * 3 + y) % 255) as u8;
        Rgb([r, 128, 255u8.saturating_sub(r)])
    });
    img.save(&path).unwrap();
    path
}

/// Build a two-subject dataset and return the number of files with parseable names.
pub fn build_dataset(root: &Path) -> usize {
    write_capture(root, "Subject_1/Camera/Subject_1_in_c_1m_live.png");
    write_capture(root, "Subject_1/Mobile/Subject_1_out_m_2m_spoof.png");
    write_capture(root, "Subject_2/Camera/S2_in_c_3m_propcat.png");
    write_capture(root, "Subject_2/Camera/unlabeled.png");
    fs::write(root.join("Subject_2/Camera/readme.txt"), b"not a capture").unwrap();
    3
}
