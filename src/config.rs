use std::{
    num::NonZeroU64,
    path::{Path, PathBuf},
};

/// Bytes in one "G" unit as understood by `fallocate -l <N>G`.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Holds every option chosen on the command line. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub create_swapfile: bool,
    pub swap_size_gb: NonZeroU64,
    pub preview: bool,
    pub non_interactive: bool,
}

impl RunConfig {
    /// Requested swapfile size in bytes.
    pub fn swap_size_bytes(&self) -> u64 {
        self.swap_size_gb.get().saturating_mul(GIB)
    }

    /// Preview wins over non-interactive: `--preview --non-interactive`
    /// still must not touch the disk.
    pub fn mode(&self) -> ExecutionMode {
        if self.preview {
            ExecutionMode::Preview
        } else if self.non_interactive {
            ExecutionMode::NonInteractive
        } else {
            ExecutionMode::Interactive
        }
    }
}

/// How every mutating action is treated by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Interactive,
    NonInteractive,
    Preview,
}

impl ExecutionMode {
    pub fn display_name(self) -> &'static str {
        match self {
            ExecutionMode::Interactive => "interactive",
            ExecutionMode::NonInteractive => "non-interactive",
            ExecutionMode::Preview => "preview",
        }
    }
}

/// Host files the tool reads or mutates.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub swapfile: PathBuf,
    pub fstab: PathBuf,
    pub grub_defaults: PathBuf,
    pub grub_cfg: PathBuf,
    pub mkinitcpio_conf: PathBuf,
}

impl HostPaths {
    pub fn system() -> Self {
        Self {
            swapfile: PathBuf::from("/swapfile"),
            fstab: PathBuf::from("/etc/fstab"),
            grub_defaults: PathBuf::from("/etc/default/grub"),
            grub_cfg: PathBuf::from("/boot/grub/grub.cfg"),
            mkinitcpio_conf: PathBuf::from("/etc/mkinitcpio.conf"),
        }
    }

    /// Same layout rooted somewhere else (used by tests).
    #[cfg(test)]
    pub fn under(root: &Path) -> Self {
        Self {
            swapfile: root.join("swapfile"),
            fstab: root.join("etc/fstab"),
            grub_defaults: root.join("etc/default/grub"),
            grub_cfg: root.join("boot/grub/grub.cfg"),
            mkinitcpio_conf: root.join("etc/mkinitcpio.conf"),
        }
    }

    /// Directory that holds the swapfile. Queried for the mount instead of
    /// the file itself so it resolves before the file exists.
    pub fn swapfile_dir(&self) -> &Path {
        self.swapfile
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("/"))
    }
}
