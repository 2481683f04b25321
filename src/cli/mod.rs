//! CLI module for the rps-gesture tool
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;
pub mod menu;

pub use config::CliConfigBuilder;
pub use main_impl::{main, Cli};
pub use menu::{next_command, MenuCommand, Shell};
