use crate::error::HibernateError;

/// Fails with `NotRoot` unless the effective UID is 0.
///
/// Runs in every mode, preview included: reading the extent map or the
/// swap signature of a 0600 file already needs root.
pub fn ensure_root() -> Result<(), HibernateError> {
    let euid = std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| effective_uid(&s))
        .unwrap_or(u32::MAX); // default to non-root if unreadable

    log::debug!("effective uid {}", euid);
    if euid != 0 {
        return Err(HibernateError::NotRoot);
    }
    Ok(())
}

// "Uid:\t<real>\t<effective>\t<saved>\t<fs>"
fn effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find(|l| l.starts_with("Uid:"))
        .and_then(|l| l.split_whitespace().nth(2))
        .and_then(|v| v.parse().ok())
}
