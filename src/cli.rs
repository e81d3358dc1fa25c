//! Command-line surface.

use std::num::NonZeroU64;

use clap::Parser;

use crate::config::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "setup-hibernate", version)]
#[command(about = "Configure hibernation to a swapfile (GRUB + mkinitcpio)")]
#[command(long_about = "Configure hibernation to a swapfile (GRUB + mkinitcpio).\n\n\
    Optionally creates /swapfile, then writes resume=UUID=... and resume_offset=... \
    into GRUB_CMDLINE_LINUX_DEFAULT, adds the resume hook to mkinitcpio.conf and \
    rebuilds the initramfs. Every change is shown and confirmed unless \
    --non-interactive is given; --preview changes nothing.")]
#[command(after_help = "Exit status:\n  \
    0  success, or preview completed\n  \
    1  an operation failed\n  \
    2  invalid command line\n  \
    3  aborted by user")]
pub struct Cli {
    /// Create, format and activate /swapfile before configuring resume
    #[arg(long)]
    pub create_swapfile: bool,

    /// Swapfile size in GB (GiB), used with --create-swapfile
    #[arg(long, value_name = "GB", default_value = "32")]
    pub swap_size: NonZeroU64,

    /// Show what would be done without making changes
    #[arg(short = 'p', long)]
    pub preview: bool,

    /// Apply all changes without prompting
    #[arg(long)]
    pub non_interactive: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            create_swapfile: self.create_swapfile,
            swap_size_gb: self.swap_size,
            preview: self.preview,
            non_interactive: self.non_interactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;

    #[test]
    fn defaults_match_documented_surface() {
        let cli = Cli::try_parse_from(["setup-hibernate"]).unwrap();
        let cfg = cli.run_config();
        assert!(!cfg.create_swapfile);
        assert_eq!(cfg.swap_size_gb.get(), 32);
        assert_eq!(cfg.mode(), ExecutionMode::Interactive);
    }

    #[test]
    fn short_preview_flag() {
        let cli = Cli::try_parse_from([
            "setup-hibernate",
            "--create-swapfile",
            "--swap-size",
            "8",
            "-p",
        ])
        .unwrap();
        let cfg = cli.run_config();
        assert!(cfg.create_swapfile);
        assert_eq!(cfg.swap_size_gb.get(), 8);
        assert_eq!(cfg.mode(), ExecutionMode::Preview);
    }

    #[test]
    fn zero_swap_size_is_rejected() {
        assert!(Cli::try_parse_from(["setup-hibernate", "--swap-size", "0"]).is_err());
    }

    #[test]
    fn verbose_counts() {
        let cli = Cli::try_parse_from(["setup-hibernate", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
