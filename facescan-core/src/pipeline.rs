//! Per-image processing: parse the name, decode, detect, crop, and build the report row.
//!
//! Nothing in here aborts a batch. Unparseable names and undecodable images are skipped;
//! detection and crop failures still produce a row.

use std::path::{Path, PathBuf};

use image::GenericImageView;
use log::{info, warn};

use crate::cropper::{CropTarget, PixelBox, crop_and_save};
use crate::detector::FaceDetector;
use crate::metadata::{MetadataError, parse_path};
use crate::postprocess::best_detection;
use crate::report::{DetectionOutcome, ImageRecord, Report, round_seconds};
use facescan_utils::{RunSettings, load_image, timing_guard};

/// Output options shared by every image in a batch.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub crop_prefix: String,
    pub jpeg_quality: u8,
}

impl PipelineOptions {
    pub fn from_run_settings(output_dir: impl Into<PathBuf>, run: &RunSettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            crop_prefix: run.crop_prefix.clone(),
            jpeg_quality: run.jpeg_quality,
        }
    }
}

/// Why an image produced no report row.
#[derive(Debug)]
pub enum SkipReason {
    Metadata(MetadataError),
    Unreadable(anyhow::Error),
}

/// Result of processing one file.
#[derive(Debug)]
pub enum ImageOutcome {
    Recorded(ImageRecord),
    Skipped(SkipReason),
}

/// Process a single capture file.
pub fn process_image<D>(detector: &D, path: &Path, options: &PipelineOptions) -> ImageOutcome
where
    D: FaceDetector + ?Sized,
{
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let metadata = match parse_path(path) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!("Filename parse error for {name}: {err}");
            return ImageOutcome::Skipped(SkipReason::Metadata(err));
        }
    };

    let image = match load_image(path) {
        Ok(image) => image,
        Err(err) => {
            warn!("Could not read image {name}: {err:#}");
            return ImageOutcome::Skipped(SkipReason::Unreadable(err));
        }
    };
    let input_size = image.dimensions();

    let guard = timing_guard("facescan_core::face_detection", log::Level::Debug);
    let detections = detector.detect(&image);
    let elapsed = round_seconds(guard.finish().as_secs_f64());

    let outcome = match detections {
        Err(err) => {
            warn!("Detection error for {name}: {err:#}");
            DetectionOutcome::Failed
        }
        Ok(detections) => match best_detection(&detections) {
            None => {
                warn!("No face detected in {name}");
                DetectionOutcome::NoFace
            }
            Some(best) => {
                let face = PixelBox::from_detection(best);
                let target = CropTarget {
                    output_dir: &options.output_dir,
                    prefix: &options.crop_prefix,
                    subject_number: &metadata.subject_number,
                    original_name: &name,
                    jpeg_quality: options.jpeg_quality,
                };
                match crop_and_save(&image, &face, &target) {
                    Ok(Some(_)) => DetectionOutcome::Cropped { face },
                    Ok(None) => DetectionOutcome::NoFace,
                    Err(err) => {
                        warn!("Failed to save crop for {name}: {err:#}");
                        DetectionOutcome::NoFace
                    }
                }
            }
        },
    };

    ImageOutcome::Recorded(ImageRecord::new(name, &metadata, input_size, outcome, elapsed))
}

/// Process `images` in order and collect a row for every file that was not skipped.
pub fn run_batch<D, I, P>(detector: &D, images: I, options: &PipelineOptions) -> Report
where
    D: FaceDetector + ?Sized,
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut report = Report::new();
    for path in images {
        let path = path.as_ref();
        info!("Processing: {}", path.display());
        if let ImageOutcome::Recorded(record) = process_image(detector, path, options) {
            report.push(record);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postprocess::Detection;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::fs;
    use tempfile::tempdir;

    struct FixedDetector(anyhow::Result<Vec<Detection>>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
            match &self.0 {
                Ok(detections) => Ok(detections.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    fn face(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id: 0,
        }
    }

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([90, 60, 30])))
            .save(&path)
            .unwrap();
        path
    }

    fn options(dir: &Path) -> PipelineOptions {
        PipelineOptions::from_run_settings(dir.join("out"), &RunSettings::default())
    }

    fn recorded(outcome: ImageOutcome) -> ImageRecord {
        match outcome {
            ImageOutcome::Recorded(record) => record,
            ImageOutcome::Skipped(reason) => panic!("unexpected skip: {reason:?}"),
        }
    }

    #[test]
    fn best_face_is_cropped_and_recorded() {
        let dir = tempdir().unwrap();
        let path = write_image(dir.path(), "Subject_42_in_c_1m_live.png", 200, 150);
        let detector = FixedDetector(Ok(vec![
            face(5.0, 5.0, 25.0, 25.0, 0.6),
            face(40.7, 30.2, 100.9, 110.0, 0.93),
        ]));
        let opts = options(dir.path());

        let record = recorded(process_image(&detector, &path, &opts));
        assert_eq!(record.subject_number, "42");
        assert_eq!(record.face_box_label(), "40,30,100,110");
        assert_eq!(record.cropped_size_label(), "60x80");
        assert_eq!(record.input_size, (200, 150));
        assert!(record.detection_time >= 0.0);

        let crops: Vec<_> = fs::read_dir(&opts.output_dir).unwrap().collect();
        assert_eq!(crops.len(), 1);
        let crop_path = opts.output_dir.join("crop_42_Subject_42_in_c_1m_live.png");
        let crop = image::open(crop_path).unwrap();
        assert_eq!(crop.dimensions(), (60, 80));
    }

    #[test]
    fn no_detection_writes_no_crop() {
        let dir = tempdir().unwrap();
        let path = write_image(dir.path(), "S1_out_m_2m_spoof.png", 64, 64);
        let opts = options(dir.path());

        let record = recorded(process_image(&FixedDetector(Ok(vec![])), &path, &opts));
        assert_eq!(record.status().as_label(), "No Detection");
        assert_eq!(record.outcome, DetectionOutcome::NoFace);
        assert!(!opts.output_dir.exists());
    }

    #[test]
    fn detector_failure_records_sentinel_time() {
        let dir = tempdir().unwrap();
        let path = write_image(dir.path(), "S1_in_c_1m.png", 32, 32);
        let detector = FixedDetector(Err(anyhow::anyhow!("inference exploded")));

        let record = recorded(process_image(&detector, &path, &options(dir.path())));
        assert_eq!(record.outcome, DetectionOutcome::Failed);
        assert_eq!(record.detection_time, -1.0);
        assert_eq!(record.face_box_label(), "No face detected");
    }

    #[test]
    fn degenerate_box_is_not_detected() {
        let dir = tempdir().unwrap();
        let path = write_image(dir.path(), "S1_in_c_1m.png", 32, 32);
        let detector = FixedDetector(Ok(vec![face(10.2, 10.0, 10.9, 20.0, 0.9)]));

        let record = recorded(process_image(&detector, &path, &options(dir.path())));
        assert_eq!(record.outcome, DetectionOutcome::NoFace);
        assert_eq!(record.cropped_size_label(), "N/A");
    }

    #[test]
    fn crop_write_failure_keeps_row_as_not_detected() {
        let dir = tempdir().unwrap();
        let path = write_image(dir.path(), "S7_in_c_1m_live.png", 64, 64);
        let opts = options(dir.path());
        fs::write(&opts.output_dir, b"occupied by a file").unwrap();
        let detector = FixedDetector(Ok(vec![face(4.0, 4.0, 40.0, 40.0, 0.9)]));

        let record = recorded(process_image(&detector, &path, &opts));
        assert_eq!(record.outcome, DetectionOutcome::NoFace);
        assert_eq!(record.status().as_label(), "No Detection");
        assert!(record.detection_time >= 0.0);
        assert!(opts.output_dir.is_file());
    }

    #[test]
    fn bad_names_and_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let bad_name = write_image(dir.path(), "portrait.png", 16, 16);
        let unreadable = dir.path().join("S2_in_c_1m.jpg");
        fs::write(&unreadable, b"not an image").unwrap();
        let detector = FixedDetector(Ok(vec![]));
        let opts = options(dir.path());

        assert!(matches!(
            process_image(&detector, &bad_name, &opts),
            ImageOutcome::Skipped(SkipReason::Metadata(_))
        ));
        assert!(matches!(
            process_image(&detector, &unreadable, &opts),
            ImageOutcome::Skipped(SkipReason::Unreadable(_))
        ));
    }

    #[test]
    fn batch_keeps_traversal_order_and_skips() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_image(dir.path(), "S3_in_c_1m_live.png", 40, 40),
            write_image(dir.path(), "broken.png", 40, 40),
            write_image(dir.path(), "S1_out_m_2m.png", 40, 40),
        ];
        let detector = FixedDetector(Ok(vec![face(0.0, 0.0, 20.0, 20.0, 0.8)]));

        let report = run_batch(&detector, &paths, &options(dir.path()));
        let names: Vec<&str> = report
            .records()
            .iter()
            .map(|r| r.image_name.as_str())
            .collect();
        assert_eq!(names, ["S3_in_c_1m_live.png", "S1_out_m_2m.png"]);
        assert_eq!(report.summary().detected, 2);
    }
}
