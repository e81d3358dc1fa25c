//! Narrow interface over the external tools the pipeline drives.
//!
//! Stages only talk to [`HostTools`]; [`SystemTools`] is the production
//! implementation that shells out, tests substitute a recording fake.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{cmd, error::HibernateError};

// ── Data types ────────────────────────────────────────────────────────────────

/// One contiguous run of physical blocks, in filesystem blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub physical_start: u64,
    pub length: u64,
}

/// Parsed `filefrag -v` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentMap {
    pub file_size: u64,
    pub block_size: u64,
    pub extents: Vec<Extent>,
}

/// Device and filesystem type backing a mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSource {
    pub device: String,
    pub fstype: String,
}

pub trait HostTools {
    /// Space-reserving allocation of `size_gb` GiB (never sparse).
    fn allocate(&self, path: &Path, size_gb: u64) -> Result<(), HibernateError>;
    fn format_swap(&self, path: &Path) -> Result<(), HibernateError>;
    fn activate_swap(&self, path: &Path) -> Result<(), HibernateError>;
    fn deactivate_swap(&self, path: &Path) -> Result<(), HibernateError>;
    /// Paths currently in the kernel swap table.
    fn active_swaps(&self) -> Result<Vec<PathBuf>, HibernateError>;
    fn extent_map(&self, path: &Path) -> Result<ExtentMap, HibernateError>;
    fn mount_source(&self, path: &Path) -> Result<MountSource, HibernateError>;
    fn filesystem_uuid(&self, device: &str) -> Result<String, HibernateError>;
    /// Resume offset as computed by btrfs-progs, already in page units.
    fn btrfs_resume_offset(&self, path: &Path) -> Result<u64, HibernateError>;
    fn page_size(&self) -> Result<u64, HibernateError>;
    fn regenerate_grub(&self, output: &Path) -> Result<(), HibernateError>;
    /// Rebuilds every mkinitcpio preset.
    fn rebuild_initramfs(&self) -> Result<(), HibernateError>;
}

// ── Production implementation ─────────────────────────────────────────────────

/// Drives the real utilities through [`cmd`].
pub struct SystemTools;

impl HostTools for SystemTools {
    fn allocate(&self, path: &Path, size_gb: u64) -> Result<(), HibernateError> {
        let p = path.to_string_lossy();
        cmd::run_with_spinner(
            "fallocate",
            &["-l", &format!("{}G", size_gb), &p],
            &format!("Allocating {} GiB at {}…", size_gb, p),
            &format!("{} allocated ({} GiB).", p, size_gb),
        )
    }

    fn format_swap(&self, path: &Path) -> Result<(), HibernateError> {
        let p = path.to_string_lossy();
        cmd::run_with_spinner(
            "mkswap",
            &[&p],
            &format!("Writing swap signature to {}…", p),
            &format!("{} formatted as swap.", p),
        )
    }

    fn activate_swap(&self, path: &Path) -> Result<(), HibernateError> {
        let p = path.to_string_lossy();
        cmd::run_with_spinner(
            "swapon",
            &[&p],
            &format!("Activating swap on {}…", p),
            &format!("Swap on {} activated.", p),
        )
    }

    fn deactivate_swap(&self, path: &Path) -> Result<(), HibernateError> {
        let p = path.to_string_lossy();
        cmd::run_with_spinner(
            "swapoff",
            &[&p],
            &format!("Deactivating swap on {}…", p),
            &format!("Swap on {} deactivated.", p),
        )
    }

    fn active_swaps(&self) -> Result<Vec<PathBuf>, HibernateError> {
        let content = fs::read_to_string("/proc/swaps")?;
        Ok(parse_proc_swaps(&content))
    }

    fn extent_map(&self, path: &Path) -> Result<ExtentMap, HibernateError> {
        let out = cmd::run_capture("filefrag", &["-v", &path.to_string_lossy()])?;
        parse_filefrag(&out)
    }

    fn mount_source(&self, path: &Path) -> Result<MountSource, HibernateError> {
        let out = cmd::run_capture(
            "findmnt",
            &["-no", "SOURCE,FSTYPE", "-T", &path.to_string_lossy()],
        )?;
        parse_findmnt(&out)
    }

    fn filesystem_uuid(&self, device: &str) -> Result<String, HibernateError> {
        let out = cmd::run_capture("blkid", &["-s", "UUID", "-o", "value", device])?;
        single_value(&out, "blkid UUID")
    }

    fn btrfs_resume_offset(&self, path: &Path) -> Result<u64, HibernateError> {
        let out = cmd::run_capture(
            "btrfs",
            &["inspect-internal", "map-swapfile", "-r", &path.to_string_lossy()],
        )?;
        parse_number(&out, "btrfs map-swapfile")
    }

    fn page_size(&self) -> Result<u64, HibernateError> {
        let out = cmd::run_capture("getconf", &["PAGESIZE"])?;
        parse_number(&out, "getconf PAGESIZE")
    }

    fn regenerate_grub(&self, output: &Path) -> Result<(), HibernateError> {
        let o = output.to_string_lossy();
        cmd::run_with_spinner(
            "grub-mkconfig",
            &["-o", &o],
            &format!("Generating {}…", o),
            &format!("{} regenerated.", o),
        )
    }

    fn rebuild_initramfs(&self) -> Result<(), HibernateError> {
        cmd::run_with_spinner(
            "mkinitcpio",
            &["-P"],
            "Rebuilding initramfs images (mkinitcpio -P)…",
            "Initramfs images rebuilt.",
        )
    }
}

// ── Output parsers ────────────────────────────────────────────────────────────

fn resolution(msg: impl Into<String>) -> HibernateError {
    HibernateError::Resolution(msg.into())
}

/// Exactly one non-empty line, trimmed.
fn single_value(out: &str, what: &str) -> Result<String, HibernateError> {
    let mut lines = out.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(v), None) => Ok(v.to_string()),
        (None, _) => Err(resolution(format!("{} returned nothing", what))),
        (Some(_), Some(_)) => Err(resolution(format!("{} returned several values", what))),
    }
}

fn parse_number(out: &str, what: &str) -> Result<u64, HibernateError> {
    let v = single_value(out, what)?;
    v.parse()
        .map_err(|_| resolution(format!("{} printed '{}', expected a number", what, v)))
}

// `/proc/swaps`:
//   Filename          Type   Size      Used  Priority
//   /swapfile         file   33554428  0     -2
// Spaces inside paths are escaped as \040.
pub(crate) fn parse_proc_swaps(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .skip(1)
        .filter_map(|l| l.split_whitespace().next())
        .map(|p| PathBuf::from(p.replace("\\040", " ")))
        .collect()
}

// `findmnt -no SOURCE,FSTYPE -T <path>`:
//   /dev/nvme0n1p2 ext4
//   /dev/sda2[/@] btrfs
pub(crate) fn parse_findmnt(out: &str) -> Result<MountSource, HibernateError> {
    let line = single_value(out, "findmnt")?;
    let mut fields = line.split_whitespace();
    let (Some(source), Some(fstype), None) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(resolution(format!("unexpected findmnt output '{}'", line)));
    };

    // btrfs sources carry the subvolume in brackets.
    let device = source.split('[').next().unwrap_or(source);
    if device.is_empty() {
        return Err(resolution(format!("findmnt reported no device in '{}'", line)));
    }

    Ok(MountSource {
        device: device.to_string(),
        fstype: fstype.to_string(),
    })
}

// `filefrag -v <path>`:
//   Filesystem type is: ef53
//   File size of /swapfile is 4294967296 (1048576 blocks of 4096 bytes)
//    ext:     logical_offset:        physical_offset: length:   expected: flags:
//      0:        0..   32767:    1081344..   1114111:  32768:             unwritten
//   /swapfile: 33 extents found
pub(crate) fn parse_filefrag(out: &str) -> Result<ExtentMap, HibernateError> {
    let mut file_size = None;
    let mut block_size = None;
    let mut extents = Vec::new();

    for line in out.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("File size of ") {
            file_size = rest
                .rsplit_once(" is ")
                .and_then(|(_, tail)| tail.split_whitespace().next())
                .and_then(|n| n.parse::<u64>().ok());
            block_size = rest
                .split("blocks of ")
                .nth(1)
                .and_then(|tail| tail.split_whitespace().next())
                .and_then(|n| n.parse::<u64>().ok());
            continue;
        }

        if let Some(extent) = parse_extent_line(trimmed) {
            extents.push(extent);
        }
    }

    let file_size =
        file_size.ok_or_else(|| resolution("filefrag did not report the file size"))?;
    let block_size = block_size
        .filter(|b| *b > 0)
        .ok_or_else(|| resolution("filefrag did not report the block size"))?;

    Ok(ExtentMap {
        file_size,
        block_size,
        extents,
    })
}

// "0:        0..   32767:    1081344..   1114111:  32768:   [expected:] flags"
fn parse_extent_line(line: &str) -> Option<Extent> {
    let mut fields = line.split(':');
    fields.next()?.trim().parse::<u64>().ok()?;
    fields.next()?; // logical range
    let physical = fields.next()?;
    let length = fields.next()?.trim().parse::<u64>().ok()?;

    let physical_start = physical.split("..").next()?.trim().parse::<u64>().ok()?;
    Some(Extent {
        physical_start,
        length,
    })
}
