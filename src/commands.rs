//! Operator commands
//! This module defines the commands that can be typed on the console while the
//! bridge runs.

use std::str::FromStr;

use anyhow::{Result, anyhow};

use crate::core::ManagerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Run the manual round-trip test
    ManualTest,
    /// Print the current link status
    Status,
    Quit,
    Help,
}

impl FromStr for OperatorCommand {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "t" | "test" => Ok(Self::ManualTest),
            "s" | "status" => Ok(Self::Status),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "h" | "help" | "?" => Ok(Self::Help),
            other => Err(anyhow!("Unknown command: {:?} (try \"help\")", other)),
        }
    }
}

/// Outcome of an executed command, for the console loop.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue(String),
    Quit,
}

pub const HELP_TEXT: &str = "commands: test (t) | status (s) | quit (q)";

/// Executes a command against the running manager.
pub fn execute(command: OperatorCommand, manager: &ManagerHandle) -> Result<CommandOutcome> {
    match command {
        OperatorCommand::ManualTest => {
            manager.manual_test()?;
            Ok(CommandOutcome::Continue("Manual test started".to_string()))
        }
        OperatorCommand::Status => {
            let status = serde_json::to_string_pretty(&manager.status())?;
            Ok(CommandOutcome::Continue(status))
        }
        OperatorCommand::Quit => Ok(CommandOutcome::Quit),
        OperatorCommand::Help => Ok(CommandOutcome::Continue(HELP_TEXT.to_string())),
    }
}
