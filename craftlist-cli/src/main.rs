use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use craftlist_lib::{Error, GraphListStore, StoreError, config::CoreConfig, fs};
use sysexits::ExitCode as Sysexit;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod inventory;
mod list;

#[derive(Parser, Debug)]
#[command(name = "craftlist")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use this database instead of the configured one
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Operate on lists
    #[command(subcommand)]
    List(list::Command),
    /// Inspect an inventory export
    #[command(subcommand)]
    Inventory(inventory::Command),
    /// Copy the list database to another file, by default a timestamped one in the data
    /// directory
    Backup { path: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Human friendly panicking in release mode
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Logging
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            if let Error::Store(store_err) = &err
                && store_err.is_retryable()
            {
                eprintln!("{}", "The operation may succeed if retried".dimmed());
            }
            exit_code(&err).into()
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    // Inventory files don't need the database
    if let Command::Inventory(cmd) = &cli.command {
        return inventory::handle(cmd);
    }

    let mut cfg = CoreConfig::load()?;
    if let Some(database) = &cli.database {
        cfg.set_database(database.clone());
    }
    let store = GraphListStore::open(cfg.database())?;

    match &cli.command {
        Command::List(cmd) => list::handle(&store, cmd).await,
        Command::Backup { path } => {
            let path = match path {
                Some(path) => path.clone(),
                None => fs::backup_path()?,
            };
            store.backup(&path).await?;
            println!("Backed up to {}", path.display());
            Ok(())
        }
        Command::Inventory(_) => Ok(()),
    }
}

fn exit_code(err: &Error) -> Sysexit {
    match err {
        Error::Store(StoreError::Unavailable { .. }) => Sysexit::Unavailable,
        Error::Store(StoreError::PartialDelete { .. }) => Sysexit::TempFail,
        Error::Store(StoreError::NotFound(_) | StoreError::Unsaved) => Sysexit::NoInput,
        Error::Store(StoreError::Corrupt(_)) | Error::Parse(_) => Sysexit::DataErr,
        Error::InvalidId(_) => Sysexit::Usage,
        Error::Io(_) => Sysexit::IoErr,
        Error::ConfigSerialize(_) => Sysexit::Software,
        Error::UnsupportedConfig { .. } | Error::NoHome => Sysexit::Config,
    }
}
