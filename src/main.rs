mod cli;
mod cmd;
mod config;
mod error;
mod gate;
mod host;
mod logging;
mod pipeline;
mod steps;
mod ui;

#[cfg(test)]
mod testutil;

use clap::Parser;

use cli::Cli;
use config::{ExecutionMode, HostPaths, RunConfig};
use error::HibernateError;
use gate::{Gate, TerminalPrompter};
use host::SystemTools;
use pipeline::{Failure, Stage};

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = cli.run_config();

    if let Err(failure) = run(&config) {
        println!();
        match failure.error {
            HibernateError::Aborted => {
                ui::print_warning(&format!("{}: {}", failure.stage, failure.error));
            }
            ref e => ui::print_error(&format!("{} failed: {}", failure.stage, e)),
        }
        log::error!("{} stopped the run: {}", failure.stage, failure.error);
        std::process::exit(failure.exit_code());
    }
}

fn run(config: &RunConfig) -> Result<(), Failure> {
    // ── Guard ─────────────────────────────────────────────────────────────────
    steps::privilege::ensure_root().map_err(pipeline::at(Stage::Privilege))?;

    let mode = config.mode();
    ui::print_banner(mode.display_name());
    match mode {
        ExecutionMode::Preview => {
            ui::print_warning("PREVIEW MODE: nothing will be written, no command will run.")
        }
        ExecutionMode::NonInteractive => {
            ui::print_info("Non-interactive: every change is applied without asking.")
        }
        ExecutionMode::Interactive => {
            ui::print_info("You will be asked before each change to the system.")
        }
    }
    log::info!("starting in {} mode: {:?}", mode.display_name(), config);

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let prompter = TerminalPrompter;
    let gate = Gate::new(mode, &prompter);
    let paths = HostPaths::system();
    pipeline::run(config, &paths, &SystemTools, &gate)?;

    // ── Done ──────────────────────────────────────────────────────────────────
    println!();
    if gate.is_preview() {
        ui::print_success(&format!(
            "Hibernate setup preview complete ({} actions planned).",
            gate.history().len()
        ));
    } else {
        ui::print_success("Hibernate setup complete. Reboot to apply:");
        ui::print_info("  sudo reboot");
    }
    Ok(())
}
