use std::path::PathBuf;

use thiserror::Error;

/// Exit status for a run declined at a confirmation prompt.
pub const EXIT_ABORTED: i32 = 3;
/// Exit status for any other failure.
pub const EXIT_FAILED: i32 = 1;

#[derive(Debug, Error)]
pub enum HibernateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{program}' failed with exit code {code}{}", stderr_suffix(.stderr))]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Command '{program}' not found (install the '{package}' package)")]
    CommandNotFound { program: String, package: String },

    #[error("Aborted by user, nothing further was changed")]
    Aborted,

    #[error("This tool must be run as root (try: sudo setup-hibernate ...)")]
    NotRoot,

    #[error(
        "{} is {actual} bytes but {expected} bytes were requested; \
         refusing to overwrite an existing swapfile",
        .path.display()
    )]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Cannot determine resume parameters: {0}")]
    Resolution(String),

    #[error("Unexpected format in {}: {reason}", .path.display())]
    ConfigFormat { path: PathBuf, reason: String },

    /// A regeneration tool failed after the boot configuration was settled.
    /// `config_changed` records whether this run wrote the config files.
    #[error(
        "Regeneration failed: {reason}\n{}. Fix the problem above, then run \
         '{command}' manually (or re-run setup-hibernate) before hibernating.",
        config_state(.config_changed)
    )]
    Regeneration {
        command: String,
        reason: String,
        config_changed: bool,
    },

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl HibernateError {
    /// Process exit status for this error. A decline is kept distinct from
    /// a failure so wrapper scripts can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            HibernateError::Aborted => EXIT_ABORTED,
            _ => EXIT_FAILED,
        }
    }
}

fn config_state(changed: &bool) -> &'static str {
    if *changed {
        "The bootloader configuration WAS updated"
    } else {
        "The bootloader configuration is already set up for resume and was not modified"
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
