use std::{fs, path::Path};

use crate::{
    config::HostPaths,
    error::HibernateError,
    gate::{Action, Gate},
    host::HostTools,
    ui,
};

/// Adds the `resume` hook to mkinitcpio.conf if needed, then rebuilds every
/// preset.
///
/// Only called once the boot config is settled; `boot_config_changed`
/// says whether this run wrote it. Failures are turned into `Regeneration`
/// so the operator learns the state of the boot config. A decline stays an
/// abort.
pub fn run(
    paths: &HostPaths,
    tools: &dyn HostTools,
    gate: &Gate<'_>,
    boot_config_changed: bool,
) -> Result<(), HibernateError> {
    regenerate(paths, tools, gate).map_err(|e| match e {
        HibernateError::Aborted => e,
        other => HibernateError::Regeneration {
            command: "mkinitcpio -P".to_string(),
            reason: other.to_string(),
            config_changed: boot_config_changed,
        },
    })
}

fn regenerate(paths: &HostPaths, tools: &dyn HostTools, gate: &Gate<'_>) -> Result<(), HibernateError> {
    let path = paths.mkinitcpio_conf.as_path();
    let old = fs::read_to_string(path)?;

    match with_resume_hook(&old, path)? {
        None => ui::print_success("'resume' hook already present."),
        Some(new) => {
            gate.apply(
                &Action::WriteFile {
                    path,
                    old: &old,
                    new: &new,
                },
                || {
                    fs::write(path, &new)?;
                    ui::print_success(&format!("'resume' hook added to {}.", path.display()));
                    Ok(())
                },
            )?;
        }
    }

    gate.apply(&Action::Run("mkinitcpio -P".to_string()), || {
        tools.rebuild_initramfs()
    })?;
    Ok(())
}

/// Returns the updated config, or `None` when every `HOOKS=` line already
/// handles resume.
///
/// `resume` goes after `encrypt`/`lvm2` (whichever is last), else before
/// `filesystems`, else at the end. The `systemd` hook resumes on its own
/// and is left alone.
fn with_resume_hook(content: &str, path: &Path) -> Result<Option<String>, HibernateError> {
    let format_error = |reason: String| HibernateError::ConfigFormat {
        path: path.to_path_buf(),
        reason,
    };

    let mut out = String::with_capacity(content.len() + 8);
    let mut found = false;
    let mut changed = false;

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = &line[body.len()..];

        let Some(value) = body.trim_start().strip_prefix("HOOKS=") else {
            out.push_str(line);
            continue;
        };
        found = true;

        let (open, close, inner) = if let Some(v) = value.trim_end().strip_prefix('(') {
            ('(', ')', v.strip_suffix(')'))
        } else if let Some(v) = value.trim_end().strip_prefix('"') {
            ('"', '"', v.strip_suffix('"'))
        } else {
            ('(', ')', None)
        };
        let Some(inner) = inner else {
            return Err(format_error(format!(
                "line {}: cannot parse HOOKS: {}",
                idx + 1,
                body
            )));
        };

        let mut hooks: Vec<&str> = inner.split_whitespace().collect();
        if hooks.contains(&"resume") || hooks.contains(&"systemd") {
            out.push_str(line);
            continue;
        }

        let after = hooks
            .iter()
            .rposition(|h| *h == "encrypt" || *h == "lvm2")
            .map(|i| i + 1);
        let before = hooks.iter().position(|h| *h == "filesystems");
        let at = after.or(before).unwrap_or(hooks.len());
        hooks.insert(at, "resume");

        let indent = &body[..body.len() - body.trim_start().len()];
        out.push_str(&format!(
            "{}HOOKS={}{}{}{}",
            indent,
            open,
            hooks.join(" "),
            close,
            ending
        ));
        changed = true;
    }

    if !found {
        return Err(format_error("no HOOKS= line found".to_string()));
    }
    Ok(changed.then_some(out))
}
