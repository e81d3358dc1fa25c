use std::{
    io,
    process::{Command, Output, Stdio},
};

use crate::{error::HibernateError, ui};

// ── Internal helpers ──────────────────────────────────────────────────────────

fn not_found_or_io(program: &str, err: io::Error) -> HibernateError {
    if err.kind() == io::ErrorKind::NotFound {
        HibernateError::CommandNotFound {
            program: program.to_string(),
            package: package_for(program).to_string(),
        }
    } else {
        HibernateError::Io(err)
    }
}

fn failed(program: &str, output: &Output) -> HibernateError {
    HibernateError::CommandFailed {
        program: program.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn print_captured_output(stdout: &[u8]) {
    let out = String::from_utf8_lossy(stdout);
    if !out.trim().is_empty() {
        eprintln!("{}", out.trim());
    }
}

/// Maps a binary name to the Arch package that ships it.
fn package_for(program: &str) -> &str {
    match program {
        "filefrag" | "e2fsck" | "tune2fs" => "e2fsprogs",
        "fallocate" | "mkswap" | "swapon" | "swapoff" | "findmnt" | "blkid" => "util-linux",
        "btrfs" => "btrfs-progs",
        "getconf" => "glibc",
        "grub-mkconfig" => "grub",
        "mkinitcpio" => "mkinitcpio",
        other => other,
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Run a command **silently** while displaying a spinner.
/// On success prints `done_msg` with a ✓.
/// On failure prints captured stdout; stderr travels inside the error.
pub fn run_with_spinner(
    program: &str,
    args: &[&str],
    spin_msg: &str,
    done_msg: &str,
) -> Result<(), HibernateError> {
    log::debug!("running {} {}", program, args.join(" "));

    let pb = ui::spinner(spin_msg);
    let result = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e));
    pb.finish_and_clear();

    let output = result?;
    if !output.status.success() {
        print_captured_output(&output.stdout);
        return Err(failed(program, &output));
    }

    ui::print_success(done_msg);
    Ok(())
}

/// Run a command, capture its stdout, and return it as a `String`.
pub fn run_capture(program: &str, args: &[&str]) -> Result<String, HibernateError> {
    log::debug!("querying {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))?;

    if !output.status.success() {
        return Err(failed(program, &output));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
