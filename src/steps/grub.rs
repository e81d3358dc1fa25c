use std::{fs, path::Path};

use crate::{
    config::HostPaths,
    error::HibernateError,
    gate::{Action, Gate, Outcome},
    host::HostTools,
    steps::resume::ResumeTarget,
    ui,
};

/// Kernel command line appended to normal (non-recovery) boot entries.
pub const CMDLINE_KEY: &str = "GRUB_CMDLINE_LINUX_DEFAULT";

/// Replaces any `resume=`/`resume_offset=` tokens in a space-separated
/// kernel command line with `tokens`, keeping everything else in order.
pub fn rewrite_cmdline(cmdline: &str, tokens: &[String; 2]) -> String {
    cmdline
        .split_whitespace()
        .filter(|t| !t.starts_with("resume=") && !t.starts_with("resume_offset="))
        .chain(tokens.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrites every `GRUB_CMDLINE_LINUX_DEFAULT=` assignment in a GRUB
/// defaults file. All other lines come back byte-for-byte.
pub fn rewrite_config(
    content: &str,
    path: &Path,
    tokens: &[String; 2],
) -> Result<String, HibernateError> {
    let format_error = |reason: String| HibernateError::ConfigFormat {
        path: path.to_path_buf(),
        reason,
    };

    let mut out = String::with_capacity(content.len() + 64);
    let mut found = false;

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = &line[body.len()..];
        let indent_len = body.len() - body.trim_start().len();
        let (indent, rest) = body.split_at(indent_len);

        let Some(value) = rest
            .strip_prefix(CMDLINE_KEY)
            .and_then(|r| r.strip_prefix('='))
        else {
            out.push_str(line);
            continue;
        };

        let (quote, cmdline) = split_quoted(value.trim_end()).ok_or_else(|| {
            format_error(format!(
                "line {}: cannot parse the value of {} safely: {}",
                idx + 1,
                CMDLINE_KEY,
                body
            ))
        })?;

        found = true;
        let quote = quote.unwrap_or('"');
        out.push_str(&format!(
            "{}{}={}{}{}{}",
            indent,
            CMDLINE_KEY,
            quote,
            rewrite_cmdline(cmdline, tokens),
            quote,
            ending
        ));
    }

    if !found {
        return Err(format_error(format!("no {}= line found", CMDLINE_KEY)));
    }
    Ok(out)
}

/// `"..."`, `'...'` or a bare word. Anything else (trailing comments,
/// embedded quotes, command substitution across quotes) is refused.
fn split_quoted(value: &str) -> Option<(Option<char>, &str)> {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q) {
            let inner = inner.strip_suffix(q)?;
            if inner.contains(q) {
                return None;
            }
            return Some((Some(q), inner));
        }
    }

    if value.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        return None;
    }
    Some((None, value))
}

/// Writes the resume tokens into the GRUB defaults file, then regenerates
/// `grub.cfg`.
///
/// The regeneration runs even when the defaults file was already current,
/// so a re-run repairs an earlier failed `grub-mkconfig`. Returns whether
/// the defaults file was written. A failed regeneration becomes
/// `Regeneration`; a decline stays an abort.
pub fn run(
    paths: &HostPaths,
    target: &ResumeTarget,
    tools: &dyn HostTools,
    gate: &Gate<'_>,
) -> Result<bool, HibernateError> {
    if target.is_planned() && !gate.is_preview() {
        return Err(HibernateError::Resolution(
            "resume offset is still unknown".to_string(),
        ));
    }

    let path = paths.grub_defaults.as_path();
    let old = fs::read_to_string(path)?;
    let new = rewrite_config(&old, path, &target.tokens())?;

    let mut wrote = false;
    if new == old {
        ui::print_success(&format!("{} already up to date.", path.display()));
    } else {
        let outcome = gate.apply(
            &Action::WriteFile {
                path,
                old: &old,
                new: &new,
            },
            || {
                fs::write(path, &new)?;
                ui::print_success(&format!("{} updated.", path.display()));
                Ok(())
            },
        )?;
        wrote = outcome == Outcome::Executed;
    }

    let cfg = paths.grub_cfg.as_path();
    let command = format!("grub-mkconfig -o {}", cfg.display());
    gate.apply(&Action::Run(command.clone()), || tools.regenerate_grub(cfg))
        .map_err(|e| match e {
            HibernateError::Aborted => e,
            other => HibernateError::Regeneration {
                command,
                reason: other.to_string(),
                config_changed: wrote,
            },
        })?;
    Ok(wrote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ExecutionMode,
        steps::resume::ResumeParameters,
        testutil::{FakeTools, ScriptedPrompter},
    };
    use tempfile::tempdir;

    fn tokens(uuid: &str, offset: u64) -> [String; 2] {
        ResumeTarget::Resolved(ResumeParameters {
            uuid: uuid.to_string(),
            offset,
        })
        .tokens()
    }

    const GRUB: &str = "\
# GRUB boot loader configuration

GRUB_DEFAULT=0
GRUB_TIMEOUT=5
GRUB_CMDLINE_LINUX_DEFAULT=\"loglevel=3 quiet\"
GRUB_CMDLINE_LINUX=\"\"

# Uncomment to disable graphical terminal
#GRUB_TERMINAL_OUTPUT=console
";

    #[test]
    fn tokens_are_appended_to_plain_cmdline() {
        assert_eq!(
            rewrite_cmdline("root=/dev/sda1 quiet", &tokens("WXYZ", 2048)),
            "root=/dev/sda1 quiet resume=UUID=WXYZ resume_offset=2048"
        );
    }

    #[test]
    fn rerun_replaces_old_offset() {
        let once = rewrite_cmdline("root=/dev/sda1 quiet", &tokens("WXYZ", 2048));
        assert_eq!(
            rewrite_cmdline(&once, &tokens("WXYZ", 4096)),
            "root=/dev/sda1 quiet resume=UUID=WXYZ resume_offset=4096"
        );
    }

    #[test]
    fn stale_tokens_anywhere_are_dropped_and_order_kept() {
        assert_eq!(
            rewrite_cmdline(
                "resume=/dev/sda2 quiet resume_offset=1 splash noresume",
                &tokens("ABCD-1234", 4096)
            ),
            "quiet splash noresume resume=UUID=ABCD-1234 resume_offset=4096"
        );
    }

    #[test]
    fn only_the_cmdline_line_changes() {
        let path = Path::new("/etc/default/grub");
        let out = rewrite_config(GRUB, path, &tokens("ABCD-1234", 4096)).unwrap();

        let expected = GRUB.replace(
            "GRUB_CMDLINE_LINUX_DEFAULT=\"loglevel=3 quiet\"",
            "GRUB_CMDLINE_LINUX_DEFAULT=\"loglevel=3 quiet resume=UUID=ABCD-1234 resume_offset=4096\"",
        );
        assert_eq!(out, expected);

        let again = rewrite_config(&out, path, &tokens("ABCD-1234", 4096)).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn quote_style_and_line_ending_are_preserved() {
        let path = Path::new("grub");
        let out = rewrite_config(
            "GRUB_CMDLINE_LINUX_DEFAULT='quiet'\r\nX=1",
            path,
            &tokens("U", 7),
        )
        .unwrap();
        assert_eq!(
            out,
            "GRUB_CMDLINE_LINUX_DEFAULT='quiet resume=UUID=U resume_offset=7'\r\nX=1"
        );

        let out = rewrite_config("GRUB_CMDLINE_LINUX_DEFAULT=quiet\n", path, &tokens("U", 7))
            .unwrap();
        assert_eq!(
            out,
            "GRUB_CMDLINE_LINUX_DEFAULT=\"quiet resume=UUID=U resume_offset=7\"\n"
        );
    }

    #[test]
    fn commented_assignment_is_not_edited() {
        let err = rewrite_config(
            "#GRUB_CMDLINE_LINUX_DEFAULT=\"quiet\"\n",
            Path::new("grub"),
            &tokens("U", 7),
        )
        .unwrap_err();
        assert!(matches!(err, HibernateError::ConfigFormat { .. }));
    }

    #[test]
    fn unparsable_value_is_refused() {
        for content in [
            "GRUB_CMDLINE_LINUX_DEFAULT=\"quiet\" # comment\n",
            "GRUB_CMDLINE_LINUX_DEFAULT=\"quiet\n",
            "GRUB_CMDLINE_LINUX_DEFAULT=quiet splash\n",
        ] {
            let err = rewrite_config(content, Path::new("grub"), &tokens("U", 7)).unwrap_err();
            assert!(matches!(err, HibernateError::ConfigFormat { .. }), "{content}");
        }
    }

    #[test]
    fn unchanged_file_is_not_rewritten_but_grub_cfg_is() {
        let dir = tempdir().unwrap();
        let paths = HostPaths::under(dir.path());
        fs::create_dir_all(paths.grub_defaults.parent().unwrap()).unwrap();
        let target = ResumeTarget::Resolved(ResumeParameters {
            uuid: "ABCD-1234".into(),
            offset: 4096,
        });
        let current = rewrite_config(GRUB, &paths.grub_defaults, &target.tokens()).unwrap();
        fs::write(&paths.grub_defaults, &current).unwrap();

        let tools = FakeTools::default();
        let prompter = ScriptedPrompter::refusing_to_be_asked();
        let gate = Gate::new(ExecutionMode::NonInteractive, &prompter);
        assert!(!run(&paths, &target, &tools, &gate).unwrap());

        assert_eq!(fs::read_to_string(&paths.grub_defaults).unwrap(), current);
        assert_eq!(gate.history().len(), 1);
        assert!(tools.called("regenerate_grub"));
    }

    #[test]
    fn grub_mkconfig_failure_on_current_file_says_nothing_was_modified() {
        let dir = tempdir().unwrap();
        let paths = HostPaths::under(dir.path());
        fs::create_dir_all(paths.grub_defaults.parent().unwrap()).unwrap();
        let target = ResumeTarget::Resolved(ResumeParameters {
            uuid: "ABCD-1234".into(),
            offset: 4096,
        });
        let current = rewrite_config(GRUB, &paths.grub_defaults, &target.tokens()).unwrap();
        fs::write(&paths.grub_defaults, &current).unwrap();

        let tools = FakeTools {
            fail_grub: true,
            ..FakeTools::default()
        };
        let prompter = ScriptedPrompter::refusing_to_be_asked();
        let gate = Gate::new(ExecutionMode::NonInteractive, &prompter);

        let err = run(&paths, &target, &tools, &gate).unwrap_err();
        match &err {
            HibernateError::Regeneration {
                command,
                config_changed,
                ..
            } => {
                assert!(command.starts_with("grub-mkconfig -o "));
                assert!(!*config_changed);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.to_string().contains("WAS updated"));
    }

    #[test]
    fn planned_target_cannot_be_written_for_real() {
        let dir = tempdir().unwrap();
        let paths = HostPaths::under(dir.path());
        let tools = FakeTools::default();
        let prompter = ScriptedPrompter::refusing_to_be_asked();
        let gate = Gate::new(ExecutionMode::NonInteractive, &prompter);

        let err = run(
            &paths,
            &ResumeTarget::Planned { uuid: "U".into() },
            &tools,
            &gate,
        )
        .unwrap_err();
        assert!(matches!(err, HibernateError::Resolution(_)));
    }
}
