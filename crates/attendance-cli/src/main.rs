//! attendance - location-gated attendance registration
//!
//! Usage:
//!   attendance                    Register attendance interactively
//!   attendance register --name N  Register without prompting
//!   attendance events             List calendar events
//!   attendance locate             Show the resolved caller location

use anyhow::Result;
use attendance_core::calendar::{parse_calendar, CALENDAR_FILE};
use attendance_core::config::{default_config_path, SPREADSHEET_ID_ENV};
use attendance_core::geo::{within_range, MAX_DISTANCE_KM, REFERENCE_POINT};
use attendance_core::{
    distance_km, Config, LedgerFactory, Locator, MemoryLedger, NetworkLocator, Notice,
    RegistrationError, RegistrationFlow, Severity, SheetsLedgerFactory,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

mod page;

#[derive(Parser)]
#[command(name = "attendance")]
#[command(about = "Register attendance for today's course")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register attendance (default)
    Register {
        /// Submit this name instead of prompting
        #[arg(short, long)]
        name: Option<String>,

        /// Keep rows in memory instead of writing to the spreadsheet
        #[arg(long)]
        dry_run: bool,
    },
    /// List the events in the calendar file
    Events,
    /// Resolve the caller's location and distance to campus
    Locate,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.into()),
        )
        .init();

    let config = load_config(cli.config)?;

    match cli.command {
        None => cmd_register(&config, None, false),
        Some(Commands::Register { name, dry_run }) => cmd_register(&config, name, dry_run),
        Some(Commands::Events) => cmd_events(),
        Some(Commands::Locate) => cmd_locate(&config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    debug!("Loading config from {}", path.display());

    match Config::load(&path) {
        Ok(config) => Ok(config),
        Err(err) => {
            eprintln!(
                "Failed to load config from {}: {:#}. Using environment and defaults.",
                path.display(),
                err
            );
            Config::from_env()
        }
    }
}

fn cmd_register(config: &Config, name: Option<String>, dry_run: bool) -> Result<ExitCode> {
    let locator = NetworkLocator::new(config);

    if dry_run {
        eprintln!("{}", "Dry run: attendance is kept in memory only".yellow());
        let ledger = MemoryLedger::new();
        let code = run_page(RegistrationFlow::new(locator, ledger.clone()), name)?;
        for row in ledger.rows() {
            debug!(?row, "Dry-run row");
        }
        return Ok(code);
    }

    if let Err(err) = config.validate() {
        eprintln!("{} {err}", "Error:".red().bold());
        eprintln!("Set {SPREADSHEET_ID_ENV} or add [ledger] spreadsheet_id to the config file.");
        return Ok(ExitCode::FAILURE);
    }
    run_page(
        RegistrationFlow::new(locator, SheetsLedgerFactory::new(config)),
        name,
    )
}

/// Render the page for one registration run
fn run_page<L, F>(flow: RegistrationFlow<L, F>, name: Option<String>) -> Result<ExitCode>
where
    L: Locator,
    F: LedgerFactory,
{
    page::header();
    debug!(date = %flow.today(), "Starting registration");

    let mut session = match flow.begin() {
        Ok(session) => session,
        Err(err) => return Ok(finish(&Notice::for_error(&err))),
    };
    page::event(session.event_name());
    debug!(event_date = %session.event().date, "Waiting for a display name");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut pending = name;

    loop {
        let candidate = match pending.take() {
            Some(name) => name,
            None => match page::prompt_name(&mut input)? {
                Some(name) => name,
                None => {
                    page::notice(&Notice::new(
                        Severity::Warning,
                        "No name entered. Attendance was not registered.",
                    ));
                    return Ok(ExitCode::FAILURE);
                }
            },
        };

        match session.submit_name(&candidate) {
            Ok(record) => return Ok(finish(&Notice::registered(&record))),
            Err(RegistrationError::EmptyName) => {
                page::notice(&Notice::for_error(&RegistrationError::EmptyName));
            }
            Err(err) => return Ok(finish(&Notice::for_error(&err))),
        }
    }
}

fn finish(notice: &Notice) -> ExitCode {
    page::notice(notice);
    match notice.severity {
        Severity::Error => ExitCode::FAILURE,
        Severity::Warning | Severity::Success => ExitCode::SUCCESS,
    }
}

fn cmd_events() -> Result<ExitCode> {
    let events = match parse_calendar(CALENDAR_FILE) {
        Ok(events) => events,
        Err(err) => {
            eprintln!("{} {err}", "Error:".red().bold());
            return Ok(ExitCode::FAILURE);
        }
    };

    if events.is_empty() {
        println!("{}", format!("No events in {CALENDAR_FILE}").yellow());
        return Ok(ExitCode::SUCCESS);
    }

    let today = Local::now().date_naive();
    println!("{}", format!("Events in {CALENDAR_FILE}").cyan().bold());
    for event in &events {
        let line = format!("  {}  {}", event.date, event.name);
        if event.date == today {
            println!("{}  {}", line.green().bold(), "(today)".green());
        } else {
            println!("{line}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_locate(config: &Config) -> Result<ExitCode> {
    let locator = NetworkLocator::new(config);
    let (ip, coordinate) = match locator.resolve_caller_location() {
        Ok(resolved) => resolved,
        Err(err) => {
            eprintln!("{} {err}", "Error:".red().bold());
            return Ok(ExitCode::FAILURE);
        }
    };

    let distance = distance_km(coordinate, REFERENCE_POINT);
    println!("  IP:          {ip}");
    println!(
        "  Coordinate:  {:.4}, {:.4}",
        coordinate.latitude, coordinate.longitude
    );
    println!("  Distance:    {distance:.2} km (limit {MAX_DISTANCE_KM:.1} km)");
    if within_range(distance) {
        println!("  {}", "Within range".green());
    } else {
        println!("  {}", "Out of range".red());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_registers() {
        let cli = Cli::try_parse_from(["attendance"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_register_flags() {
        let cli =
            Cli::try_parse_from(["attendance", "register", "--name", "Ana", "--dry-run", "-v"])
                .unwrap();
        match cli.command {
            Some(Commands::Register { name, dry_run }) => {
                assert_eq!(name.as_deref(), Some("Ana"));
                assert!(dry_run);
            }
            _ => panic!("expected register"),
        }
        assert!(cli.verbose);
    }

    #[test]
    #[serial]
    fn test_unreadable_config_keeps_environment() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[ledger\nspreadsheet_id = 1").unwrap();
        file.flush().unwrap();

        let original = std::env::var(SPREADSHEET_ID_ENV).ok();
        std::env::set_var(SPREADSHEET_ID_ENV, "sheet-from-env");

        let config = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.spreadsheet_id, "sheet-from-env");
        assert!(config.validate().is_ok());

        match original {
            Some(value) => std::env::set_var(SPREADSHEET_ID_ENV, value),
            None => std::env::remove_var(SPREADSHEET_ID_ENV),
        }
    }
}
