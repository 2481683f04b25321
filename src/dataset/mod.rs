//! Dataset creation from the webcam
//!
//! Captures images of each move into `<root>/<move>/`, splits every class
//! into `train/` and `test/` subsets and optionally post-processes the split
//! images in place.

pub mod postprocess;

use crate::capture::CaptureBackend;
use crate::config::{AppConfig, CaptureConfig, DatasetConfig};
use crate::error::{Result, RpsError};
use crate::services::{ProgressReporter, Prompter};
use crate::types::{DatasetLayout, Move, Split};
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Per-class result of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSplit {
    pub class: Move,
    pub train: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

/// Builds the image dataset
pub struct DatasetCreator {
    layout: DatasetLayout,
    dataset: DatasetConfig,
    capture: CaptureConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl DatasetCreator {
    #[must_use]
    pub fn new(config: &AppConfig, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            layout: config.layout(),
            dataset: config.dataset.clone(),
            capture: config.capture.clone(),
            reporter,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Full workflow: reset the root, capture every move, split, post-process
    pub fn create_dataset(
        &self,
        backend: &dyn CaptureBackend,
        prompter: &mut dyn Prompter,
    ) -> Result<Vec<ClassSplit>> {
        reset_dir(self.layout.root(), prompter)?;
        self.create_move_dataset(backend, prompter)?;
        let splits = self.split_dataset(prompter)?;
        postprocess::apply(
            self.dataset.post_process,
            &self.layout,
            self.dataset.edge_thresholds,
            self.reporter.as_ref(),
        )?;
        prompter.notify("Dataset created");
        Ok(splits)
    }

    /// Capture images for rock, paper and scissors in turn
    pub fn create_move_dataset(
        &self,
        backend: &dyn CaptureBackend,
        prompter: &mut dyn Prompter,
    ) -> Result<Vec<PathBuf>> {
        let mut captured = Vec::new();
        for mv in Move::ALL {
            reset_dir(&self.layout.move_dir(mv), prompter)?;
            prompter.notify(&format!(
                "Show '{}' to the camera. Press SPACE to take a picture and 'q' when done",
                mv
            ));
            captured.extend(self.acquire_images(mv, backend)?);
        }
        Ok(captured)
    }

    /// Preview the webcam and save a frame each time the capture key is pressed
    ///
    /// Files are numbered from the next free index in the move's folder.
    /// Returns the written paths once the quit key is pressed.
    pub fn acquire_images(&self, mv: Move, backend: &dyn CaptureBackend) -> Result<Vec<PathBuf>> {
        let span = crate::tracing_config::spans::capture(mv.as_str(), self.capture.webcam_index);
        let _enter = span.enter();

        let dir = self.layout.move_dir(mv);
        fs::create_dir_all(&dir)
            .map_err(|e| RpsError::file_io_error("create directory", &dir, &e))?;
        let mut index = next_image_index(&dir)?;

        let mut session = backend.open(self.capture.webcam_index)?;
        let mut written = Vec::new();

        loop {
            let frame = session.read_frame()?;
            session.show(&self.capture.window_title, &frame, None)?;

            match session.wait_key(Duration::from_millis(1))? {
                Some(key) if key == self.capture.quit_key => break,
                Some(key) if key == self.capture.capture_key => {
                    let path = self.layout.capture_path(mv, index);
                    frame
                        .save(&path)
                        .map_err(|e| RpsError::image_file_error("save", &path, &e))?;
                    log::info!("📸 Saved {}", path.display());
                    written.push(path);
                    index = index.checked_add(1).ok_or_else(|| index_overflow(&dir))?;
                },
                _ => {},
            }
            std::thread::sleep(self.capture.frame_delay());
        }

        session.close()?;
        log::info!("Captured {} image(s) of {}", written.len(), mv);
        Ok(written)
    }

    /// Copy each class's captures into `train/` and `test/`
    ///
    /// `floor(ratio × N)` files per class are sampled uniformly without
    /// replacement for training; the rest go to test. Originals are kept.
    pub fn split_dataset(&self, prompter: &mut dyn Prompter) -> Result<Vec<ClassSplit>> {
        for split in Split::ALL {
            reset_dir(&self.layout.split_dir(split), prompter)?;
        }
        for split in Split::ALL {
            for mv in Move::ALL {
                reset_dir(&self.layout.split_move_dir(split, mv), prompter)?;
            }
        }

        let mut rng = match self.dataset.split_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let ratio = self.dataset.train_test_split;
        let mut result = Vec::with_capacity(Move::ALL.len());
        for mv in Move::ALL {
            let files = list_files(&self.layout.move_dir(mv))?;
            let train_count = train_size(files.len(), ratio);
            let mut in_train = vec![false; files.len()];
            for idx in rand::seq::index::sample(&mut rng, files.len(), train_count) {
                if let Some(flag) = in_train.get_mut(idx) {
                    *flag = true;
                }
            }

            let mut class = ClassSplit {
                class: mv,
                train: Vec::with_capacity(train_count),
                test: Vec::with_capacity(files.len() - train_count),
            };
            for (file, selected) in files.iter().zip(in_train) {
                let split = if selected { Split::Train } else { Split::Test };
                let Some(name) = file.file_name() else {
                    continue;
                };
                let target = self.layout.split_move_dir(split, mv).join(name);
                fs::copy(file, &target).map_err(|e| RpsError::file_io_error("copy", file, &e))?;
                match split {
                    Split::Train => class.train.push(target),
                    Split::Test => class.test.push(target),
                }
            }

            log::info!(
                "Split {}: {} train / {} test",
                mv,
                class.train.len(),
                class.test.len()
            );
            result.push(class);
        }
        Ok(result)
    }
}

/// Number of training files for `total` files at `ratio`
#[must_use]
pub fn train_size(total: usize, ratio: f64) -> usize {
    let count = (total as f64 * ratio.clamp(0.0, 1.0)).floor() as usize;
    count.min(total)
}

/// Make sure `path` exists as an empty directory, asking before deleting contents
///
/// Returns `false` when the user chose to keep an existing directory. A
/// failed removal is logged and the directory is recreated anyway.
pub fn reset_dir(path: &Path, prompter: &mut dyn Prompter) -> Result<bool> {
    if path.exists() {
        let question = format!("'{}' already exists. Delete its contents?", path.display());
        if !prompter.confirm(&question)? {
            log::debug!("Keeping existing {}", path.display());
            return Ok(false);
        }
        if let Err(e) = fs::remove_dir_all(path) {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
    fs::create_dir_all(path).map_err(|e| RpsError::file_io_error("create directory", path, &e))?;
    Ok(true)
}

/// Index for the next capture: one past the largest number found in a file name
///
/// Only the first run of ASCII digits in each name counts; names without
/// digits are ignored. An empty or missing folder starts at 0.
///
/// # Errors
/// - `Processing` when a number is too large to continue the sequence
pub fn next_image_index(dir: &Path) -> Result<u64> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let digit_run = Regex::new(r"[0-9]+")
        .map_err(|e| RpsError::internal(format!("invalid index pattern: {}", e)))?;
    let entries =
        fs::read_dir(dir).map_err(|e| RpsError::file_io_error("list directory", dir, &e))?;
    let mut next = 0u64;
    for entry in entries {
        let entry = entry.map_err(|e| RpsError::file_io_error("read directory", dir, &e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(digits) = digit_run.find(&name) else {
            continue;
        };
        let after = digits
            .as_str()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| index_overflow(dir))?;
        next = next.max(after);
    }
    Ok(next)
}

fn index_overflow(dir: &Path) -> RpsError {
    RpsError::processing(format!(
        "image numbering in '{}' has no free index left",
        dir.display()
    ))
}

/// Regular files of `dir`, sorted by name; a missing folder is empty
pub(crate) fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        log::warn!("{} does not exist, nothing to process", dir.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).map_err(|e| RpsError::file_io_error("list directory", dir, &e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| RpsError::file_io_error("read directory", dir, &e))?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoOpProgressReporter;
    use crate::test_utils::{solid_frame, ScriptedBackend, ScriptedPrompter};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn creator(root: &Path, seed: Option<u64>, ratio: f64) -> DatasetCreator {
        let mut config = AppConfig::builder()
            .dataset_root(root)
            .split_seed(seed)
            .train_test_split(ratio)
            .build()
            .unwrap();
        config.capture.frame_delay_ms = 0;
        DatasetCreator::new(&config, Arc::new(NoOpProgressReporter))
    }

    fn file_names(paths: &[PathBuf]) -> HashSet<std::ffi::OsString> {
        paths.iter().map(|p| p.file_name().unwrap().to_owned()).collect()
    }

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_next_image_index() {
        let temp = TempDir::new().unwrap();
        assert_eq!(next_image_index(&temp.path().join("missing")).unwrap(), 0);
        assert_eq!(next_image_index(temp.path()).unwrap(), 0);

        touch(temp.path(), &["img_0.jpg", "img_12.jpg", "img_3.jpg", "notes.txt"]);
        assert_eq!(next_image_index(temp.path()).unwrap(), 13);
    }

    #[test]
    fn test_only_first_digit_run_counts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["img_2_copy99.jpg"]);
        assert_eq!(next_image_index(temp.path()).unwrap(), 3);
    }

    #[test]
    fn test_exhausted_numbering_is_an_error() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), &["img_4294967295.jpg"]);
        assert_eq!(next_image_index(temp.path()).unwrap(), 4_294_967_296);

        touch(temp.path(), &["img_18446744073709551615.jpg"]);
        let err = next_image_index(temp.path()).unwrap_err();
        assert!(matches!(err, RpsError::Processing(_)));

        let other = temp.path().join("other");
        touch(&other, &["img_99999999999999999999999.jpg"]);
        assert!(matches!(next_image_index(&other), Err(RpsError::Processing(_))));
    }

    #[test]
    fn test_capture_past_u32_keeps_existing_files() {
        let temp = TempDir::new().unwrap();
        let creator = creator(temp.path(), None, 0.7);
        let rock = creator.layout().move_dir(Move::Rock);
        touch(&rock, &["img_4294967295.jpg"]);

        let backend = ScriptedBackend::new(solid_frame(4, 4, [0, 0, 0]))
            .with_key_script(vec![vec![Some(' '), Some(' '), Some('q')]]);
        let written = creator.acquire_images(Move::Rock, &backend).unwrap();

        assert_eq!(
            written,
            vec![rock.join("img_4294967296.jpg"), rock.join("img_4294967297.jpg")]
        );
        assert_eq!(fs::read(rock.join("img_4294967295.jpg")).unwrap(), b"img_4294967295.jpg");
    }

    #[test]
    fn test_reset_dir_respects_answer() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("rock");
        touch(&dir, &["img_0.jpg"]);

        let mut declining = ScriptedPrompter::new().with_confirms([false]);
        assert!(!reset_dir(&dir, &mut declining).unwrap());
        assert!(dir.join("img_0.jpg").exists());

        let mut accepting = ScriptedPrompter::new().with_confirms([true]);
        assert!(reset_dir(&dir, &mut accepting).unwrap());
        assert!(dir.is_dir());
        assert!(!dir.join("img_0.jpg").exists());

        let fresh = temp.path().join("paper");
        let mut silent = ScriptedPrompter::new();
        assert!(reset_dir(&fresh, &mut silent).unwrap());
        assert!(silent.questions().is_empty());
    }

    #[test]
    fn test_acquire_images_numbers_from_next_index() {
        let temp = TempDir::new().unwrap();
        let creator = creator(temp.path(), None, 0.7);
        touch(&creator.layout().move_dir(Move::Rock), &["img_4.jpg"]);

        let backend = ScriptedBackend::new(solid_frame(8, 6, [200, 10, 10]))
            .with_key_script(vec![vec![None, Some(' '), Some('x'), Some(' '), Some('q')]]);
        let written = creator.acquire_images(Move::Rock, &backend).unwrap();

        assert_eq!(
            written,
            vec![
                creator.layout().capture_path(Move::Rock, 5),
                creator.layout().capture_path(Move::Rock, 6),
            ]
        );
        let saved = image::open(&written[0]).unwrap();
        assert_eq!((saved.width(), saved.height()), (8, 6));

        let window = &backend.window_logs()[0];
        assert_eq!(window.shown(), 5);
        assert!(window.titles().iter().all(|t| t == "Frame"));
        assert_eq!(backend.camera_logs()[0].released(), 1);
    }

    #[test]
    fn test_frame_delay_applies_after_captures() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::builder().dataset_root(temp.path()).build().unwrap();
        config.capture.frame_delay_ms = 40;
        let creator = DatasetCreator::new(&config, Arc::new(NoOpProgressReporter));

        let backend = ScriptedBackend::new(solid_frame(4, 4, [0, 0, 0]))
            .with_key_script(vec![vec![Some(' '), Some(' '), Some(' '), Some('q')]]);
        let started = std::time::Instant::now();
        let written = creator.acquire_images(Move::Paper, &backend).unwrap();

        assert_eq!(written.len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_split_sizes_and_partition() {
        let temp = TempDir::new().unwrap();
        let creator = creator(temp.path(), Some(42), 0.7);
        let names: Vec<String> = (0..10).map(|i| format!("img_{}.jpg", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        for mv in Move::ALL {
            touch(&creator.layout().move_dir(mv), &refs[..]);
        }
        touch(&creator.layout().move_dir(Move::Scissors), &["img_10.jpg"]);

        let mut prompter = ScriptedPrompter::new();
        let splits = creator.split_dataset(&mut prompter).unwrap();

        for class in &splits {
            let total = if class.class == Move::Scissors { 11 } else { 10 };
            assert_eq!(class.train.len(), train_size(total, 0.7));
            assert_eq!(class.train.len() + class.test.len(), total);

            let train = file_names(&class.train);
            let test = file_names(&class.test);
            assert!(train.is_disjoint(&test));
            assert_eq!(train.len() + test.len(), total);
            assert!(creator.layout().move_dir(class.class).join("img_0.jpg").exists());
        }
        assert_eq!(train_size(11, 0.7), 7);
    }

    #[test]
    fn test_seeded_split_is_deterministic() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let mut picks = Vec::new();

        for temp in [&first, &second] {
            let creator = creator(temp.path(), Some(7), 0.5);
            touch(
                &creator.layout().move_dir(Move::Paper),
                &["img_0.jpg", "img_1.jpg", "img_2.jpg", "img_3.jpg"],
            );
            let splits = creator.split_dataset(&mut ScriptedPrompter::new()).unwrap();
            let paper = splits.iter().find(|s| s.class == Move::Paper).unwrap();
            let names: Vec<_> = paper
                .train
                .iter()
                .map(|p| p.file_name().unwrap().to_owned())
                .collect();
            picks.push(names);
        }

        assert_eq!(picks[0], picks[1]);
        assert_eq!(picks[0].len(), 2);
    }

    #[test]
    fn test_split_edge_ratios() {
        assert_eq!(train_size(5, 0.0), 0);
        assert_eq!(train_size(5, 1.0), 5);
        assert_eq!(train_size(0, 0.7), 0);
        assert_eq!(train_size(3, 0.7), 2);
    }
}
