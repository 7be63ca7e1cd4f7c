//! Binary entry point for promem.
//!
//! This binary provides the CLI interface for the promem profile memory
//! system.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow option_if_let_else for environment variable fallback chains
#![allow(clippy::option_if_let_else)]

use clap::{CommandFactory, Parser, Subcommand};
use promem::config::PromemConfig;
use promem::fragment::FragmentService;
use promem::host::HostTool;
use promem::monitor::ProfileMonitor;
use promem::profile::ProfileStore;
use promem::shell::{InstallOutcome, InstallStatus, ShellIntegration, UninstallOutcome};
use promem::{Error, observability};
use std::process::ExitCode;
use std::sync::Arc;

/// Promem - background user-profile memory for LLM command-line tools.
#[derive(Parser)]
#[command(name = "promem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the current profile.
    Show,

    /// Reset the profile to the default skeleton.
    Clear,

    /// Show profile, log-store, and integration status.
    Status,

    /// Print the profile file path.
    Path,

    /// Resolve a fragment argument and print its text.
    ///
    /// This is the entry point shell integrations call; `auto` also starts
    /// the background monitor for the lifetime of the command.
    Fragment {
        /// Fragment argument: `auto`, `test`, or anything (unrecognized
        /// arguments resolve to nothing).
        argument: String,
    },

    /// Run the profile monitor in the foreground until Ctrl-C.
    Watch,

    /// Install the shell integration block into the shell startup file.
    InstallShell,

    /// Remove the shell integration block from the shell startup file.
    UninstallShell,

    /// Show whether the shell integration is installed.
    ShellStatus,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    observability::init(cli.verbose);

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &PromemConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show => cmd_show(config),
        Commands::Clear => cmd_clear(config),
        Commands::Status => cmd_status(config),
        Commands::Path => cmd_path(config),
        Commands::Fragment { argument } => cmd_fragment(config, &argument),
        Commands::Watch => cmd_watch(config),
        Commands::InstallShell => cmd_install_shell(config),
        Commands::UninstallShell => cmd_uninstall_shell(config),
        Commands::ShellStatus => cmd_shell_status(config),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> promem::Result<PromemConfig> {
    // If a path is provided, load from that file
    if let Some(config_path) = path {
        return PromemConfig::load_from_file(std::path::Path::new(config_path));
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var("PROMEM_CONFIG_PATH") {
        if !config_path.trim().is_empty() {
            return PromemConfig::load_from_file(std::path::Path::new(&config_path));
        }
    }

    // Otherwise, load from default location
    Ok(PromemConfig::load_default())
}

/// Show command.
fn cmd_show(config: &PromemConfig) -> anyhow::Result<()> {
    let store = ProfileStore::from_config(config);
    let profile = store.load()?;

    if profile.is_empty() {
        println!("No profile yet at {}", store.path().display());
        println!("It will be created as interactions are observed, or by 'promem clear'.");
    } else {
        print!("{profile}");
        if !profile.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}

/// Clear command.
fn cmd_clear(config: &PromemConfig) -> anyhow::Result<()> {
    let store = ProfileStore::from_config(config);
    store.clear()?;
    println!("Profile reset to the default skeleton:");
    println!("  {}", store.path().display());
    Ok(())
}

/// Status command.
fn cmd_status(config: &PromemConfig) -> anyhow::Result<()> {
    println!("Promem Status");
    println!("=============");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let store = ProfileStore::from_config(config);
    match std::fs::metadata(store.path()) {
        Ok(meta) => {
            println!("Profile: Available ({} bytes)", meta.len());
            if let Ok(modified) = meta.modified() {
                let modified: chrono::DateTime<chrono::Local> = modified.into();
                println!("  Modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
            }
        },
        Err(_) => println!("Profile: Not created yet"),
    }
    println!("  Path: {}", store.path().display());

    let host = HostTool::from_config(&config.host);
    match host.logs_path() {
        Ok(path) => {
            println!("Interaction Log: Available");
            println!("  Path: {}", path.display());
        },
        Err(e) => {
            println!("Interaction Log: Unavailable");
            println!("  {e}");
        },
    }

    println!(
        "Background Updates: {} (poll interval {:?})",
        if config.monitor.enabled {
            "enabled"
        } else {
            "disabled"
        },
        config.monitor.poll_interval
    );

    match ShellIntegration::detect(&config.host.command) {
        Ok(integration) => {
            let state = match integration.status() {
                InstallStatus::Installed => "Installed",
                InstallStatus::NotInstalled => "Not installed",
                InstallStatus::NoRcFile => "No startup file",
            };
            println!("Shell Integration: {state}");
            println!("  File: {}", integration.rc_path().display());
        },
        Err(e) => println!("Shell Integration: Unknown ({e})"),
    }

    println!();
    println!("Use 'promem show' to print the profile");

    Ok(())
}

/// Path command.
fn cmd_path(config: &PromemConfig) -> anyhow::Result<()> {
    println!("{}", config.profile_path.display());
    Ok(())
}

/// Fragment command.
///
/// Prints the resolved fragment text to stdout and nothing else; failures
/// on this path must never alter the host tool's primary interaction, so
/// the command always exits zero.
fn cmd_fragment(config: &PromemConfig, argument: &str) -> anyhow::Result<()> {
    let service = FragmentService::from_config(config);
    let fragment = service.resolve(argument);

    if !fragment.is_empty() {
        print!("{}", fragment.text);
        if !fragment.text.ends_with('\n') {
            println!();
        }
    }

    // Best-effort cleanup: give an in-flight poll a bounded chance to finish.
    service.monitor().stop();
    Ok(())
}

/// Watch command.
fn cmd_watch(config: &PromemConfig) -> anyhow::Result<()> {
    let monitor = Arc::new(ProfileMonitor::from_config(config));
    monitor.start();

    let (stop_tx, stop_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    println!(
        "Watching '{}' interactions every {:?} (Ctrl-C to stop)",
        config.host.command, config.monitor.poll_interval
    );

    let _ = stop_rx.recv();
    println!();
    println!("Stopping profile monitor...");
    monitor.stop();

    Ok(())
}

/// Install-shell command.
fn cmd_install_shell(config: &PromemConfig) -> anyhow::Result<()> {
    let integration = ShellIntegration::detect(&config.host.command)?;
    match integration.install()? {
        InstallOutcome::Installed => {
            println!("Shell integration installed:");
            println!("  {}", integration.rc_path().display());
            println!("Restart your shell or source the file to activate it.");
        },
        InstallOutcome::AlreadyInstalled => {
            println!("Shell integration already installed:");
            println!("  {}", integration.rc_path().display());
        },
    }
    Ok(())
}

/// Uninstall-shell command.
fn cmd_uninstall_shell(config: &PromemConfig) -> anyhow::Result<()> {
    let integration = ShellIntegration::detect(&config.host.command)?;
    match integration.uninstall()? {
        UninstallOutcome::Removed => {
            println!("Shell integration removed from:");
            println!("  {}", integration.rc_path().display());
        },
        UninstallOutcome::NotPresent => {
            println!("Shell integration was not installed.");
        },
    }
    Ok(())
}

/// Shell-status command.
fn cmd_shell_status(config: &PromemConfig) -> anyhow::Result<()> {
    match ShellIntegration::detect(&config.host.command) {
        Ok(integration) => {
            match integration.status() {
                InstallStatus::Installed => println!("Installed"),
                InstallStatus::NotInstalled => println!("Not installed"),
                InstallStatus::NoRcFile => println!("Not installed (no startup file)"),
            }
            println!("  File: {}", integration.rc_path().display());
        },
        Err(Error::InvalidInput(reason)) => {
            println!("Unknown shell: {reason}");
        },
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Completions command.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "promem",
        &mut std::io::stdout(),
    );
    Ok(())
}
