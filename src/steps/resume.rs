use std::path::Path;

use crate::{
    config::HostPaths,
    error::HibernateError,
    host::{ExtentMap, HostTools},
    ui,
};

// ── Data types ────────────────────────────────────────────────────────────────

/// Kernel resume parameters for the swapfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeParameters {
    pub uuid: String,
    /// In page-size units, as the kernel's `resume_offset` expects.
    pub offset: u64,
}

/// What the boot-config stage writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeTarget {
    Resolved(ResumeParameters),
    /// Preview only: the swapfile has not been created, so there is no
    /// extent to measure yet.
    Planned { uuid: String },
}

impl ResumeTarget {
    /// The `resume=` and `resume_offset=` kernel tokens.
    pub fn tokens(&self) -> [String; 2] {
        match self {
            ResumeTarget::Resolved(p) => [
                format!("resume=UUID={}", p.uuid),
                format!("resume_offset={}", p.offset),
            ],
            ResumeTarget::Planned { uuid } => [
                format!("resume=UUID={}", uuid),
                "resume_offset=<pending>".to_string(),
            ],
        }
    }

    pub fn is_planned(&self) -> bool {
        matches!(self, ResumeTarget::Planned { .. })
    }
}

fn resolution(msg: impl Into<String>) -> HibernateError {
    HibernateError::Resolution(msg.into())
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Resolves the filesystem UUID and resume offset of the swapfile.
///
/// `allow_planned` is set only for a preview that also previewed creating
/// the swapfile; a missing swapfile is an error otherwise.
pub fn resolve(
    paths: &HostPaths,
    tools: &dyn HostTools,
    allow_planned: bool,
) -> Result<ResumeTarget, HibernateError> {
    let swapfile = paths.swapfile.as_path();

    let mount = tools.mount_source(paths.swapfile_dir())?;
    let uuid = tools.filesystem_uuid(&mount.device)?.trim().to_string();
    if uuid.is_empty() {
        return Err(resolution(format!("{} has no filesystem UUID", mount.device)));
    }
    log::info!("swapfile filesystem: {} ({}) UUID={}", mount.device, mount.fstype, uuid);

    if !swapfile.exists() {
        if allow_planned {
            ui::print_warning("Swapfile not created yet; resume_offset will be computed on a real run.");
            return Ok(ResumeTarget::Planned { uuid });
        }
        return Err(resolution(format!(
            "no swapfile at {} (run with --create-swapfile)",
            swapfile.display()
        )));
    }

    let offset = if mount.fstype == "btrfs" {
        // filefrag reports logical addresses on btrfs.
        tools.btrfs_resume_offset(swapfile)?
    } else {
        let map = tools.extent_map(swapfile)?;
        let page_size = tools.page_size()?;
        offset_from_extents(swapfile, &map, page_size)?
    };

    if offset == 0 {
        return Err(resolution(format!(
            "resume offset of {} computed as 0",
            swapfile.display()
        )));
    }

    let params = ResumeParameters { uuid, offset };
    ui::print_kv_box(
        "Resume parameters",
        &[
            ("Device", mount.device.as_str()),
            ("UUID", params.uuid.as_str()),
            ("Offset", params.offset.to_string().as_str()),
        ],
    );
    Ok(ResumeTarget::Resolved(params))
}

/// First extent's physical start, converted from filesystem blocks to
/// page-size units.
pub fn offset_from_extents(
    path: &Path,
    map: &ExtentMap,
    page_size: u64,
) -> Result<u64, HibernateError> {
    let Some(first) = map.extents.first() else {
        return Err(resolution(format!("filefrag reported no extents for {}", path.display())));
    };

    let covered = map
        .extents
        .iter()
        .map(|e| e.length.saturating_mul(map.block_size))
        .sum::<u64>();
    if covered < map.file_size {
        return Err(resolution(format!(
            "{} is sparse ({} of {} bytes backed); recreate it with fallocate",
            path.display(),
            covered,
            map.file_size
        )));
    }

    if first.physical_start == 0 {
        return Err(resolution(format!(
            "first extent of {} has physical offset 0",
            path.display()
        )));
    }

    if page_size == 0 {
        return Err(resolution("page size reported as 0"));
    }
    let bytes = first.physical_start.saturating_mul(map.block_size);
    if bytes % page_size != 0 {
        return Err(resolution(format!(
            "first extent at byte {} is not page-aligned ({} byte pages)",
            bytes, page_size
        )));
    }
    Ok(bytes / page_size)
}
