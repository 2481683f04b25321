//! In-place transforms over the split dataset
//!
//! Every regular file in `train|test/<move>` is rewritten; subfolders are
//! skipped.

use super::list_files;
use crate::config::{EdgeThresholds, PostProcess};
use crate::error::{Result, RpsError};
use crate::services::{ProgressReporter, ProgressUnit};
use crate::types::{DatasetLayout, Move, Split};
use std::path::{Path, PathBuf};

/// Run the configured post-processing, returning the number of rewritten files
pub fn apply(
    post_process: PostProcess,
    layout: &DatasetLayout,
    thresholds: EdgeThresholds,
    reporter: &dyn ProgressReporter,
) -> Result<usize> {
    match post_process {
        PostProcess::None => Ok(0),
        PostProcess::Grayscale => grayscale(layout, reporter),
        PostProcess::EdgeDetect => edge_detect(layout, thresholds, reporter),
    }
}

fn split_files(layout: &DatasetLayout) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for split in Split::ALL {
        for mv in Move::ALL {
            files.extend(list_files(&layout.split_move_dir(split, mv))?);
        }
    }
    Ok(files)
}

fn rewrite_all<F>(
    label: &str,
    layout: &DatasetLayout,
    reporter: &dyn ProgressReporter,
    mut transform: F,
) -> Result<usize>
where
    F: FnMut(&Path) -> Result<()>,
{
    let files = split_files(layout)?;
    reporter.start(label, Some(files.len() as u64), ProgressUnit::Items);
    for file in &files {
        transform(file)?;
        reporter.advance(1);
    }
    reporter.finish(&format!("{} {} file(s)", label, files.len()));
    Ok(files.len())
}

/// Convert every split image to single-channel grayscale
pub fn grayscale(layout: &DatasetLayout, reporter: &dyn ProgressReporter) -> Result<usize> {
    rewrite_all("Converting to grayscale", layout, reporter, |path| {
        let image = image::open(path).map_err(|e| RpsError::image_file_error("open", path, &e))?;
        image
            .to_luma8()
            .save(path)
            .map_err(|e| RpsError::image_file_error("save", path, &e))
    })
}

/// Replace every split image with its Canny edge map
#[cfg(feature = "opencv")]
pub fn edge_detect(
    layout: &DatasetLayout,
    thresholds: EdgeThresholds,
    reporter: &dyn ProgressReporter,
) -> Result<usize> {
    use opencv::{core, imgcodecs, imgproc, prelude::*};

    let cv_err = |path: &Path, e: opencv::Error| {
        RpsError::processing(format!("edge detection failed for '{}': {}", path.display(), e))
    };

    rewrite_all("Detecting edges", layout, reporter, |path| {
        let name = path.to_string_lossy();
        let gray = imgcodecs::imread(&name, imgcodecs::IMREAD_GRAYSCALE)
            .map_err(|e| cv_err(path, e))?;
        if gray.empty() {
            return Err(RpsError::processing(format!("cannot read image '{}'", path.display())));
        }
        let mut edges = core::Mat::default();
        imgproc::canny(&gray, &mut edges, thresholds.threshold1, thresholds.threshold2, 3, false)
            .map_err(|e| cv_err(path, e))?;
        imgcodecs::imwrite(&name, &edges, &core::Vector::new()).map_err(|e| cv_err(path, e))?;
        Ok(())
    })
}

/// Edge detection needs OpenCV
#[cfg(not(feature = "opencv"))]
pub fn edge_detect(
    _layout: &DatasetLayout,
    _thresholds: EdgeThresholds,
    _reporter: &dyn ProgressReporter,
) -> Result<usize> {
    Err(RpsError::unsupported(
        "edge detection requires the `opencv` feature",
    ))
}
