use std::{fs, path::Path};

use crate::{
    error::HibernateError,
    gate::{Action, Gate},
    ui,
};

/// Makes sure `swapfile` is activated at boot by an `/etc/fstab` entry.
///
/// Any uncommented line whose first field is the swapfile counts as
/// present, whatever its options; it is never rewritten.
pub fn ensure_entry(fstab: &Path, swapfile: &Path, gate: &Gate<'_>) -> Result<(), HibernateError> {
    let old = fs::read_to_string(fstab)?;

    let Some(new) = with_swap_entry(&old, swapfile) else {
        ui::print_success(&format!("{} already lists {}.", fstab.display(), swapfile.display()));
        return Ok(());
    };

    gate.apply(
        &Action::WriteFile {
            path: fstab,
            old: &old,
            new: &new,
        },
        || {
            fs::write(fstab, &new)?;
            ui::print_success(&format!("{} added to {}.", swapfile.display(), fstab.display()));
            Ok(())
        },
    )?;
    Ok(())
}

/// Returns the new fstab content, or `None` when an entry already exists.
fn with_swap_entry(content: &str, swapfile: &Path) -> Option<String> {
    let target = swapfile.to_string_lossy();
    let present = content
        .lines()
        .map(str::trim_start)
        .filter(|l| !l.starts_with('#'))
        .filter_map(|l| l.split_whitespace().next())
        .any(|first| first == target);
    if present {
        return None;
    }

    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("{} none swap defaults 0 0\n", target));
    Some(out)
}
