//! Line-oriented command interpreter over one [`KvStore`].
//!
//! Parsing is a pure function from a line of input to a [`Command`], kept
//! separate from execution so it can be tested without a terminal. Integer
//! parsing and whitespace trimming failures become user-facing messages;
//! nothing in here panics on bad input.

use std::path::PathBuf;

use log::warn;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;

use crate::error::StoreError;
use crate::snapshot::snapshot_exists;
use crate::store::KvStore;

/// Snapshot file used when `save`/`load` are given no argument.
pub const DEFAULT_SNAPSHOT_FILE: &str = "kvstore_data.bin";

/// Longest value accepted by the `set` command, in bytes.
pub const MAX_SET_VALUE_LEN: usize = 512;

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: i32, value: String },
    Get { key: i32 },
    Delete { key: i32 },
    List,
    Stats,
    Save { path: Option<PathBuf> },
    Load { path: Option<PathBuf> },
    Clear,
    Help,
    Quit,
}

/// Why a line failed to parse. `Display` gives the message shown to the
/// user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing key (usage: {0})")]
    MissingKey(&'static str),

    #[error("invalid key; keys are 32-bit integers")]
    InvalidKey,

    #[error("missing value (usage: set <key> <value>)")]
    MissingValue,

    #[error("value too long (max {MAX_SET_VALUE_LEN} bytes)")]
    ValueTooLong,

    #[error("unknown command '{0}' (type 'help' for available commands)")]
    UnknownCommand(String),
}

fn parse_key(arg: &str, usage: &'static str) -> Result<i32, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingKey(usage));
    }
    arg.parse().map_err(|_| ParseError::InvalidKey)
}

fn optional_path(arg: &str) -> Option<PathBuf> {
    if arg.is_empty() {
        None
    } else {
        Some(PathBuf::from(arg))
    }
}

/// Parses one input line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "set" => {
            let (key_str, value) = match rest.split_once(char::is_whitespace) {
                Some((key_str, value)) => (key_str, value.trim()),
                None => (rest, ""),
            };
            let key = parse_key(key_str, "set <key> <value>")?;
            if value.is_empty() {
                return Err(ParseError::MissingValue);
            }
            if value.len() > MAX_SET_VALUE_LEN {
                return Err(ParseError::ValueTooLong);
            }
            Command::Set {
                key,
                value: value.to_string(),
            }
        }
        "get" => Command::Get {
            key: parse_key(rest, "get <key>")?,
        },
        "delete" | "del" => Command::Delete {
            key: parse_key(rest, "delete <key>")?,
        },
        "list" | "ls" => Command::List,
        "stats" => Command::Stats,
        "save" => Command::Save {
            path: optional_path(rest),
        },
        "load" => Command::Load {
            path: optional_path(rest),
        },
        "clear" => Command::Clear,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

fn print_help(default_path: &std::path::Path) {
    println!();
    println!("Available commands:");
    println!("  set <key> <value>  - Set a key-value pair");
    println!("  get <key>          - Get value for a key");
    println!("  delete <key>       - Delete a key-value pair");
    println!("  list               - List all key-value pairs");
    println!("  stats              - Show store statistics");
    println!(
        "  save [filename]    - Save store to file (default: {})",
        default_path.display()
    );
    println!(
        "  load [filename]    - Load store from file (default: {})",
        default_path.display()
    );
    println!("  clear              - Clear all entries");
    println!("  help               - Show this help message");
    println!("  quit               - Exit the program");
    println!();
}

/// The interactive loop: a [`KvStore`] plus the snapshot path used for
/// defaults, auto-load and auto-save.
pub struct Shell {
    store: KvStore,
    default_path: PathBuf,
}

impl Shell {
    pub fn new(store: KvStore, default_path: PathBuf) -> Self {
        Self {
            store,
            default_path,
        }
    }

    /// Runs the read-eval-print loop until `quit` or end of input.
    ///
    /// Loads the default snapshot on entry when one exists, and saves back
    /// to it on exit when the store is non-empty.
    pub fn run(&mut self) -> rustyline::Result<()> {
        println!("Key-value store interactive shell");
        println!("Type 'help' for available commands, 'quit' or 'exit' to leave.");
        println!();

        self.auto_load();

        let mut editor = DefaultEditor::new()?;
        loop {
            match editor.readline("kvs> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if !self.dispatch(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        self.auto_save();
        println!("Goodbye!");
        Ok(())
    }

    fn auto_load(&mut self) {
        if !snapshot_exists(&self.default_path) {
            return;
        }
        match self.store.load(&self.default_path) {
            Ok(count) => {
                println!(
                    "Loaded {} entries from '{}'",
                    count,
                    self.default_path.display()
                );
                println!();
            }
            Err(err) => {
                warn!("could not load '{}': {err}", self.default_path.display());
            }
        }
    }

    fn auto_save(&mut self) {
        if self.store.is_empty() {
            return;
        }
        println!("Auto-saving data to '{}'...", self.default_path.display());
        if let Err(err) = self.store.save(&self.default_path) {
            warn!("could not save '{}': {err}", self.default_path.display());
        }
    }

    /// Parses and executes one line; returns `false` when the loop should
    /// stop.
    fn dispatch(&mut self, line: &str) -> bool {
        match parse_command(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => true,
            Err(err) => {
                println!("Error: {err}");
                true
            }
        }
    }

    fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::Set { key, value } => match self.store.set(key, value.as_str()) {
                Ok(_) => println!("Set: {key} = \"{value}\""),
                Err(err) => println!("Error: failed to set key-value pair: {err}"),
            },
            Command::Get { key } => match self.store.get(key) {
                Ok(value) => println!("Get: {key} = \"{value}\""),
                Err(StoreError::KeyNotFound) => println!("Key {key} not found."),
                Err(err) => println!("Error: failed to get key: {err}"),
            },
            Command::Delete { key } => match self.store.delete(key) {
                Ok(_) => println!("Deleted key: {key}"),
                Err(StoreError::KeyNotFound) => println!("Key {key} not found."),
                Err(err) => println!("Error: failed to delete key: {err}"),
            },
            Command::List => {
                if self.store.is_empty() {
                    println!("Key-value store is empty");
                } else {
                    println!("Key-value store contents ({} entries):", self.store.count());
                    for (key, value) in &self.store {
                        println!("  {key}: \"{value}\"");
                    }
                }
            }
            Command::Stats => println!("{}", self.store.stats()),
            Command::Save { path } => {
                let path = path.unwrap_or_else(|| self.default_path.clone());
                match self.store.save(&path) {
                    Ok(count) => println!("Saved {} entries to '{}'", count, path.display()),
                    Err(err) => println!("Error: failed to save to file: {err}"),
                }
            }
            Command::Load { path } => {
                let path = path.unwrap_or_else(|| self.default_path.clone());
                if !snapshot_exists(&path) {
                    println!("Error: file '{}' does not exist", path.display());
                } else {
                    match self.store.load(&path) {
                        Ok(count) => {
                            println!("Loaded {} entries from '{}'", count, path.display())
                        }
                        Err(err) => println!("Error: failed to load from file: {err}"),
                    }
                }
            }
            Command::Clear => {
                let count = self.store.count();
                self.store.clear();
                println!("Cleared {count} entries");
            }
            Command::Help => print_help(&self.default_path),
            Command::Quit => return false,
        }
        true
    }
}
