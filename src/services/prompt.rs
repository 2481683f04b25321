//! Interactive decisions
//!
//! Confirmations and numeric choices go through the `Prompter` trait so the
//! capture, split and detection flows can run without a terminal.

use crate::error::{Result, RpsError};
use std::io::{BufRead, Write};

/// Source of interactive user decisions
pub trait Prompter {
    /// Ask a yes/no question
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Ask for an integer, re-asking on unparsable input
    fn read_number(&mut self, question: &str) -> Result<i64>;

    /// Show an informational line to the user
    fn notify(&mut self, message: &str);
}

/// Prompter reading answers from a line-oriented input
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompter bound to the process stdin/stdout
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(RpsError::input("input stream closed"));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            let answer = self.ask(&format!("{} [y/N]: ", question))?;
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Error: invalid input")?,
            }
        }
    }

    fn read_number(&mut self, question: &str) -> Result<i64> {
        loop {
            let answer = self.ask(&format!("{}: ", question))?;
            match answer.parse::<i64>() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "Error: '{}' is not a valid integer.", answer)?,
            }
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "{}", message) {
            log::warn!("Failed to write to console: {}", e);
        }
    }
}
