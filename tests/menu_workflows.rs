//! Menu dispatch driven by scripted input
#![cfg(feature = "cli")]

use rps_gesture::cli::Shell;
use rps_gesture::test_utils::{
    solid_frame, FixedPredictor, RecordingProgressReporter, RecordingTrainingEngine,
    ScriptedBackend, ScriptedPrompter,
};
use rps_gesture::{
    AppConfig, ModelFamily, MovePredictor, Prediction, ProgressReporter, Result, RpsError,
    TrainingParams,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config(root: &Path) -> AppConfig {
    let mut config = AppConfig::builder()
        .dataset_root(root)
        .model_family(ModelFamily::SqueezeNet)
        .threshold(80.0)
        .build()
        .unwrap();
    config.detection.frame_delay_ms = 0;
    config.capture.frame_delay_ms = 0;
    config
}

fn reporter() -> Arc<dyn ProgressReporter> {
    Arc::new(RecordingProgressReporter::default())
}

fn scissors_loader(_config: &AppConfig, _model: &Path) -> Result<Box<dyn MovePredictor>> {
    Ok(Box::new(FixedPredictor::new(vec![
        Prediction::new("paper", 0.02),
        Prediction::new("rock", 0.11),
        Prediction::new("scissors", 0.87),
    ])))
}

#[tokio::test]
async fn test_missing_dataset_and_models_return_to_menu() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("rock_paper_scissors");
    let backend = ScriptedBackend::new(solid_frame(8, 8, [0, 0, 0]));
    let shell = Shell::new(config(&root), &backend, reporter());

    let mut prompter = ScriptedPrompter::new().with_numbers([3, 4, 9, 99]);
    let mut engine = RecordingTrainingEngine::default();
    shell.run(&mut prompter, &mut engine).await.unwrap();

    let failures: Vec<_> = prompter.messages().iter().filter(|m| m.starts_with("❌")).collect();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].contains("Download dataset"));
    assert!(prompter.messages().iter().any(|m| m == "Input a valid command"));
    assert!(engine.calls.is_empty());
    assert!(backend.opened_devices().is_empty());
}

#[tokio::test]
async fn test_train_dispatches_to_engine() {
    let temp = TempDir::new().unwrap();
    let params = TrainingParams {
        num_experiments: 5,
        batch_size: 4,
        enhance_data: false,
        ..TrainingParams::default()
    };
    let config = AppConfig::builder()
        .dataset_root(temp.path())
        .model_family(ModelFamily::SqueezeNet)
        .training_params(params.clone())
        .build()
        .unwrap();
    let backend = ScriptedBackend::new(solid_frame(8, 8, [0, 0, 0]));
    let shell = Shell::new(config, &backend, reporter());

    let mut prompter = ScriptedPrompter::new().with_numbers([3, 99]);
    let mut engine = RecordingTrainingEngine::default();
    shell.run(&mut prompter, &mut engine).await.unwrap();

    assert_eq!(engine.calls, vec!["set_model_family", "set_data_directory", "train"]);
    assert_eq!(engine.family, Some(ModelFamily::SqueezeNet));
    assert_eq!(engine.data_dir.as_deref(), Some(temp.path()));
    assert_eq!(engine.trained_with, vec![params]);
}

#[tokio::test]
async fn test_detect_uses_chosen_model() {
    let temp = TempDir::new().unwrap();
    let models = temp.path().join("models");
    std::fs::create_dir_all(&models).unwrap();
    std::fs::write(models.join("a_resnet.onnx"), b"x").unwrap();
    std::fs::write(models.join("b_squeezenet.onnx"), b"x").unwrap();

    let backend = ScriptedBackend::new(solid_frame(8, 8, [0, 0, 0]))
        .with_key_script(vec![vec![None, None, Some('q')]]);
    let shell = Shell::new(config(temp.path()), &backend, reporter())
        .with_predictor_loader(scissors_loader);

    let mut prompter = ScriptedPrompter::new().with_numbers([4, 1, 99]);
    shell
        .run(&mut prompter, &mut RecordingTrainingEngine::default())
        .await
        .unwrap();

    assert_eq!(backend.opened_devices(), vec![0]);
    let window = &backend.window_logs()[0];
    assert_eq!(window.overlays(), vec![Some("scissors (0.87)".to_string()); 3]);
    assert_eq!(window.destroyed(), 1);
    assert_eq!(backend.camera_logs()[0].released(), 1);
    assert!(prompter
        .messages()
        .iter()
        .any(|m| m == "Processed 3 frame(s), 3 with a confident move"));
    assert!(prompter.messages().iter().any(|m| m == "1. b_squeezenet.onnx"));
}

#[tokio::test]
async fn test_camera_failure_ends_the_menu() {
    let temp = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(solid_frame(8, 8, [0, 0, 0]));
    let shell = Shell::new(config(temp.path()), &backend, reporter());

    let mut prompter = ScriptedPrompter::new().with_numbers([2, 99]);
    let err = shell
        .run(&mut prompter, &mut RecordingTrainingEngine::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RpsError::Camera(_)));
    assert!(!err.is_recoverable());
}
