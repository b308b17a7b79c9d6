//! irtm - Command-line front end for YS-IRTM infrared modules
//!
//! Sends remote keys or raw NEC codes through the module, changes its baud
//! rate, and dumps whatever it receives.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use irtm_core::protocol::{supported_baud_rates, Session};
use irtm_core::remote::RemoteDirectory;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use config::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "irtm")]
#[command(about = "Drive a YS-IRTM serial infrared transceiver")]
#[command(version)]
struct Cli {
    /// YAML settings file
    #[arg(short, long, env = "IRTM_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port of the module
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate the module currently runs at
    #[arg(short, long)]
    baud: Option<u32>,

    /// Per-read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory holding remote key tables
    #[arg(short, long)]
    remotes: Option<PathBuf>,

    /// Log wire traffic
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transmit a key from a remote table
    Send {
        /// Remote name (table file stem) or path to a table
        remote: String,
        /// Key label
        key: String,
    },

    /// Transmit a raw code
    Raw {
        /// User code, 4 hex digits
        user_code: String,
        /// Command code, 2 hex digits
        command_code: String,
    },

    /// Change the module's baud rate
    Baud {
        /// New rate (4800, 9600, 19200 or 57600)
        rate: u32,
    },

    /// Print codes the module receives
    Listen {
        /// Number of reads before giving up
        #[arg(short, long, default_value_t = 10)]
        attempts: usize,
    },

    /// List remotes or the keys of one remote
    Remotes {
        /// Remote to show keys for
        remote: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        port: cli.port,
        baud_rate: cli.baud,
        timeout_ms: cli.timeout_ms,
        remotes_dir: cli.remotes,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;
    tracing::debug!(?settings, "settings resolved");

    match cli.command {
        Commands::Send { remote, key } => {
            let remotes = RemoteDirectory::new(&settings.remotes_dir);
            let mut session = Session::serial(settings.session_config());
            session
                .send_key(&remotes, &remote, &key)
                .with_context(|| format!("sending '{}' on '{}'", key, remote))?;
            println!("{} {} / {}", "sent".green().bold(), remote, key);
        }
        Commands::Raw {
            user_code,
            command_code,
        } => {
            let mut session = Session::serial(settings.session_config());
            session
                .transmit_hex(&user_code, &command_code)
                .with_context(|| format!("sending {}{}", user_code, command_code))?;
            println!("{} {}{}", "sent".green().bold(), user_code, command_code);
        }
        Commands::Baud { rate } => {
            let mut session = Session::serial(settings.session_config());
            session.change_baud_rate(rate).with_context(|| {
                let supported: Vec<String> =
                    supported_baud_rates().map(|r| r.to_string()).collect();
                format!("changing baud rate to {} (supported: {})", rate, supported.join(", "))
            })?;
            println!(
                "{} module now runs at {} baud, use --baud {} from now on",
                "ok".green().bold(),
                session.working_baud_rate(),
                session.working_baud_rate()
            );
        }
        Commands::Listen { attempts } => {
            let mut session = Session::serial(settings.session_config());
            let chunks = session.listen(attempts).context("listening")?;
            if chunks.is_empty() {
                println!("{}", "nothing received".yellow());
            }
            for chunk in chunks {
                println!("{}", hex::encode_upper(&chunk));
            }
        }
        Commands::Remotes { remote } => {
            let remotes = RemoteDirectory::new(&settings.remotes_dir);
            match remote {
                Some(remote) => {
                    let table = remotes.table(&remote)?;
                    println!(
                        "{} (user code {})",
                        table.name.as_deref().unwrap_or(&remote).bold(),
                        table.user_code
                    );
                    for label in table.key_labels() {
                        println!("  {:<16} {}", label, table.keys[label]);
                    }
                }
                None => {
                    for name in remotes.remotes()? {
                        println!("{}", name);
                    }
                }
            }
        }
    }

    Ok(())
}
