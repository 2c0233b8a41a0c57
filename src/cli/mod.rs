use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

use crate::cli::args::{Cli, Command};
use crate::cli::commands::{backup, exit_for_error, status};
use crate::logging::init_tracing;
use crate::types::RunMode;

const CONFIG_FILE: &str = "/etc/esxivault.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const LICENSE_NAME: &str = "GNU GPL v3 or later";
const COPYRIGHT: &str = "Copyright (C) 2025 esxivault contributors";
const PROJECT_URL: &str = "https://github.com/esxivault/esxivault";

pub mod args;
pub mod commands;

pub fn run() -> Result<()> {
    let cli = parse_cli();
    let capture = init_tracing(cli.verbose);

    print_banner();
    if cli.help {
        print_help();
        return Ok(());
    }
    if cli.version {
        print_version();
        return Ok(());
    }

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let run_mode = RunMode {
        dry_run: cli.dry_run,
        safe_mode: cli.safe,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Some(Command::Backup(args)) => {
            backup::run_backup_command(&config_path, &args.profile, run_mode, &capture)
        }
        Some(Command::Status(args)) => status::run_status_command(&config_path, &args.profile),
        None => {
            print_help();
            std::process::exit(2);
        }
    };
    if let Err(err) = result {
        exit_for_error(&err);
    }
    Ok(())
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.kind() == ErrorKind::DisplayHelp {
                print_banner();
                print_help();
                std::process::exit(0);
            }
            if err.kind() == ErrorKind::DisplayVersion {
                print_banner();
                print_version();
                std::process::exit(0);
            }
            if err.kind() == ErrorKind::UnknownArgument {
                if let Some(arg) = err.context().find_map(|c| {
                    if let clap::error::ContextKind::InvalidArg = c.0 {
                        Some(c.1.to_string())
                    } else {
                        None
                    }
                }) {
                    println!("unknown option {}", arg);
                    std::process::exit(2);
                }
            }
            println!("{}", err);
            std::process::exit(2);
        }
    }
}

fn print_banner() {
    println!("esxivault {}", VERSION);
}

fn print_version() {
    println!("{}", COPYRIGHT);
    println!("Project: {}", PROJECT_URL);
    println!("License: {}", LICENSE_NAME);
}

fn print_help() {
    println!("Usage:");
    println!("  esxivault backup <profile> [options]");
    println!("  esxivault status <profile> [--config <path>]");
    println!("  esxivault --version");
    println!();
    println!("Options:");
    println!("  --config <path>   Config file path (default {})", CONFIG_FILE);
    println!("  --dry-run         Select the VM but do not connect or delete anything");
    println!("  --safe            Do not delete old archives");
    println!("  -v, --verbose     Verbose logging");
}
