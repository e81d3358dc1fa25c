//! The single choke point every host mutation goes through.
//!
//! `Planned -> Previewed | Confirmed -> Executed | Declined -> Aborted`.
//! Each action transitions exactly once; there is no retry.

use std::{cell::RefCell, fmt, path::Path};

use dialoguer::Confirm;

use crate::{
    config::ExecutionMode,
    error::HibernateError,
    ui,
};

// ── Actions ───────────────────────────────────────────────────────────────────

/// A mutation the pipeline intends to perform, described for the operator.
#[derive(Debug, Clone)]
pub enum Action<'a> {
    /// An external command, shown as it would be typed.
    Run(String),
    SetMode { path: &'a Path, mode: u32 },
    RemoveFile { path: &'a Path },
    WriteFile {
        path: &'a Path,
        old: &'a str,
        new: &'a str,
    },
}

impl fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Run(command) => write!(f, "run `{}`", command),
            Action::SetMode { path, mode } => {
                write!(f, "set mode {:04o} on {}", mode, path.display())
            }
            Action::RemoveFile { path } => write!(f, "remove {}", path.display()),
            Action::WriteFile { path, .. } => write!(f, "write changes to {}", path.display()),
        }
    }
}

impl Action<'_> {
    fn print_diff(&self) {
        if let Action::WriteFile { path, old, new } = self {
            ui::print_diff(&path.to_string_lossy(), old, new);
        }
    }
}

/// The line shown for `action` before it is decided, per mode.
fn announcement(mode: ExecutionMode, action: &Action<'_>) -> String {
    match mode {
        ExecutionMode::Preview => format!("Would {}", action),
        ExecutionMode::Interactive => format!("About to {}", action),
        ExecutionMode::NonInteractive => format!("Applying: {}", action),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Executed,
    Previewed,
}

// ── Prompting ─────────────────────────────────────────────────────────────────

/// Yes/no question source. Interactive runs use the terminal.
pub trait Prompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, HibernateError>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, HibernateError> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}

// ── Gate ──────────────────────────────────────────────────────────────────────

pub struct Gate<'a> {
    mode: ExecutionMode,
    prompter: &'a dyn Prompter,
    history: RefCell<Vec<(String, Outcome)>>,
}

impl<'a> Gate<'a> {
    pub fn new(mode: ExecutionMode, prompter: &'a dyn Prompter) -> Self {
        Self {
            mode,
            prompter,
            history: RefCell::new(Vec::new()),
        }
    }

    pub fn is_preview(&self) -> bool {
        self.mode == ExecutionMode::Preview
    }

    /// Passes `action` through the current mode and runs `op` only when
    /// the mode allows it. A decline aborts the whole run.
    pub fn apply<F>(&self, action: &Action<'_>, op: F) -> Result<Outcome, HibernateError>
    where
        F: FnOnce() -> Result<(), HibernateError>,
    {
        let outcome = match self.mode {
            ExecutionMode::Preview => {
                ui::print_preview(&announcement(self.mode, action));
                action.print_diff();
                log::info!("previewed: {}", action);
                Outcome::Previewed
            }
            ExecutionMode::Interactive => {
                ui::print_info(&announcement(self.mode, action));
                action.print_diff();
                if !self.prompter.confirm("Proceed?", false)? {
                    log::warn!("declined: {}", action);
                    return Err(HibernateError::Aborted);
                }
                op()?;
                log::info!("executed: {}", action);
                Outcome::Executed
            }
            ExecutionMode::NonInteractive => {
                ui::print_info(&announcement(self.mode, action));
                op()?;
                log::info!("executed: {}", action);
                Outcome::Executed
            }
        };

        self.history
            .borrow_mut()
            .push((action.to_string(), outcome));
        Ok(outcome)
    }

    /// A yes/no question outside the action flow (e.g. replacing an
    /// existing swapfile). Only interactive runs ever answer yes.
    pub fn ask(&self, question: &str) -> Result<bool, HibernateError> {
        match self.mode {
            ExecutionMode::Interactive => self.prompter.confirm(question, false),
            ExecutionMode::NonInteractive | ExecutionMode::Preview => Ok(false),
        }
    }

    /// Descriptions and outcomes of every action that passed the gate.
    pub fn history(&self) -> Vec<(String, Outcome)> {
        self.history.borrow().clone()
    }
}
