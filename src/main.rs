//! Chiclet - a terminal editor for flow step instructions.
//!
//! # Usage
//!
//! ```bash
//! chiclet step.json
//! chiclet --watch step.json
//! chiclet --debug-log events.log step.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use chiclet::app::App;
use chiclet::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use chiclet::perf;

/// A terminal editor for flow step instructions with inline reference tokens
#[derive(Parser, Debug)]
#[command(name = "chiclet", version, about, long_about = None)]
struct Cli {
    /// Flow step file to edit (created on first save if missing)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Watch the file and reload outside edits
    #[arg(short, long)]
    watch: bool,

    /// Enable startup performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed event/timing records to a file
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults in .chicletrc
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in .chicletrc
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let event_log_path = effective
        .debug_log
        .clone()
        .or_else(|| std::env::var_os("CHICLET_EVENT_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_event_log(event_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize event log {}: {}",
            event_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    // A missing file is not an error: run() starts from a blank step and
    // Ctrl+S creates it.
    let app = App::new(cli.file).with_watch(effective.watch);
    app.run().context("Application error")
}
