//! Stage sequencing. Every stage fails fast; nothing after a failure runs.

use std::fmt;

use crate::{
    config::{HostPaths, RunConfig},
    error::HibernateError,
    gate::Gate,
    host::HostTools,
    steps::{fstab, grub, initramfs, resume, resume::ResumeTarget, swapfile},
    ui,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Privilege,
    Swapfile,
    Resume,
    Bootloader,
    Initramfs,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Privilege => "Privilege check",
            Stage::Swapfile => "Swapfile setup",
            Stage::Resume => "Resume parameter lookup",
            Stage::Bootloader => "Bootloader configuration",
            Stage::Initramfs => "Initramfs regeneration",
        })
    }
}

/// An error tagged with the stage it stopped the run in.
#[derive(Debug)]
pub struct Failure {
    pub stage: Stage,
    pub error: HibernateError,
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

pub fn at(stage: Stage) -> impl Fn(HibernateError) -> Failure {
    move |error| Failure { stage, error }
}

/// Runs swapfile provisioning (when requested), resolution, the boot
/// config edit and initramfs regeneration, in that order.
pub fn run(
    config: &RunConfig,
    paths: &HostPaths,
    tools: &dyn HostTools,
    gate: &Gate<'_>,
) -> Result<ResumeTarget, Failure> {
    let total = if config.create_swapfile { 4 } else { 3 };
    let mut step = 0;
    let mut next = |title: &str| {
        step += 1;
        ui::print_step(step, total, title);
    };

    if config.create_swapfile {
        next("Swapfile");
        swapfile::run(config, &paths.swapfile, tools, gate).map_err(at(Stage::Swapfile))?;
        fstab::ensure_entry(&paths.fstab, &paths.swapfile, gate).map_err(at(Stage::Swapfile))?;
    }

    next("Resume parameters");
    let allow_planned = gate.is_preview() && config.create_swapfile;
    let target = resume::resolve(paths, tools, allow_planned).map_err(at(Stage::Resume))?;

    next("Bootloader");
    let boot_config_changed =
        grub::run(paths, &target, tools, gate).map_err(at(Stage::Bootloader))?;

    next("Initramfs");
    initramfs::run(paths, tools, gate, boot_config_changed).map_err(at(Stage::Initramfs))?;

    Ok(target)
}
