//! Service layer shared by the library flows and the CLI

pub mod progress;
pub mod prompt;

pub use progress::{
    create_cli_progress_reporter, LogProgressReporter, NoOpProgressReporter, ProgressReporter,
    ProgressUnit,
};
#[cfg(feature = "cli")]
pub use progress::IndicatifReporter;
pub use prompt::{ConsolePrompter, Prompter};
