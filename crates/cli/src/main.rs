//! kvengine CLI — a small shell for exercising any registered engine.
//!
//! `kvengine --engine csmap --path /tmp/pool --create-if-missing put k v`

mod commands;
mod format;

use std::process;

use kvengine::{register_builtin_engines, Config, Database, IterControl};

use commands::{build_cli, matches_to_action, Action};
use format::{format_bool, format_count, format_entry, format_error, format_value, OutputMode};

fn main() {
    tracing_subscriber::fmt::init();
    register_builtin_engines();

    let matches = build_cli().get_matches();

    if matches.subcommand_name() == Some("engines") {
        for name in kvengine::registered_engine_names() {
            println!("{name}");
        }
        return;
    }

    let mode = if matches.get_flag("raw") { OutputMode::Raw } else { OutputMode::Human };

    let db = match open_database(&matches) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("(error) {e}");
            process::exit(1);
        }
    };

    process::exit(run(&db, matches_to_action(&matches), mode));
}

fn open_database(matches: &clap::ArgMatches) -> Result<Database, String> {
    let engine = matches.get_one::<String>("engine").map(String::as_str).unwrap_or("cmap");

    let mut config = Config::new();
    if let Some(path) = matches.get_one::<String>("path") {
        config.put_string("path", path.clone());
    }
    if let Some(size) = matches.get_one::<u64>("size") {
        config.put_uint64("size", *size);
    }
    if matches.get_flag("create-if-missing") {
        config.put_uint64("create_if_missing", 1);
    }

    Database::open(engine, config).map_err(|e| format!("failed to open engine `{engine}`: {e}"))
}

fn run(db: &Database, action: Action, mode: OutputMode) -> i32 {
    match action {
        Action::Put { key, value } => match db.put(&key, &value) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        Action::Get { key } => match db.get(&key) {
            Ok(value) => {
                println!("{}", format_value(&value, mode));
                0
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        Action::Del { key } => match db.remove(&key) {
            Ok(removed) => {
                println!("{}", format_bool(removed, mode));
                0
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        Action::Exists { key } => match db.exists(&key) {
            Ok(present) => {
                println!("{}", format_bool(present, mode));
                0
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        Action::Count { lower, upper } => {
            let result = match (&lower, &upper) {
                (None, None) => db.count_all(),
                (Some(l), None) => db.count_above(l),
                (None, Some(u)) => db.count_below(u),
                (Some(l), Some(u)) => db.count_between(l, u),
            };
            match result {
                Ok(n) => {
                    println!("{}", format_count(n, mode));
                    0
                }
                Err(e) => {
                    eprintln!("{}", format_error(&e, mode));
                    1
                }
            }
        }
        Action::Scan { lower, upper } => {
            let mut visit = |key: &[u8], value: &[u8]| -> IterControl {
                println!("{}", format_entry(key, value, mode));
                IterControl::Continue
            };
            let result = match (&lower, &upper) {
                (None, None) => db.get_all(&mut visit),
                (Some(l), None) => db.get_above(l, &mut visit),
                (None, Some(u)) => db.get_below(u, &mut visit),
                (Some(l), Some(u)) => db.get_between(l, u, &mut visit),
            };
            match result {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("{}", format_error(&e, mode));
                    1
                }
            }
        }
        Action::Defrag => match db.defrag(100, 100) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        Action::ListEngines => unreachable!("handled before open_database"),
    }
}
