use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use probekv::cli::{Shell, DEFAULT_SNAPSHOT_FILE};
use probekv::KvStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot file used by save/load defaults and startup auto-load.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Initial table capacity; 0 selects the built-in default.
    #[arg(short, long, default_value_t = 0)]
    capacity: usize,
}

fn init_logger() {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env();
    // Avoid panicking if a logger was already installed.
    let _ = builder.try_init();
}

fn main() -> ExitCode {
    init_logger();
    let args = Args::parse();

    let store = match KvStore::with_capacity(args.capacity) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Error: failed to create key-value store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_FILE));

    match Shell::new(store, path).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
