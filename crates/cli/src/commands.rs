//! Clap command tree definition.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("kvengine")
        .about("Shell for the kvengine embedded key-value library")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("engine")
                .long("engine")
                .short('e')
                .help("Engine to open: cmap, csmap, radix, heterogeneous_radix, robinhood, vsmap, blackhole")
                .default_value("cmap")
                .global(true),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .short('p')
                .help("Pool/file path for persistent or file-backed engines")
                .global(true),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .help("Pool size in bytes, used when creating a new pool")
                .value_parser(value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new("create-if-missing")
                .long("create-if-missing")
                .action(ArgAction::SetTrue)
                .help("Create the pool if it does not already exist")
                .global(true),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .action(ArgAction::SetTrue)
                .help("Raw output: bare values, no type prefixes")
                .global(true),
        )
        .subcommand(Command::new("put").about("Insert or overwrite a key").arg(Arg::new("key").required(true)).arg(Arg::new("value").required(true)))
        .subcommand(Command::new("get").about("Read a key").arg(Arg::new("key").required(true)))
        .subcommand(Command::new("del").about("Remove a key").arg(Arg::new("key").required(true)))
        .subcommand(Command::new("exists").about("Check whether a key is present").arg(Arg::new("key").required(true)))
        .subcommand(Command::new("count").about("Count entries").arg(Arg::new("lower").help("exclusive lower bound")).arg(Arg::new("upper").help("exclusive upper bound")))
        .subcommand(Command::new("scan").about("List entries in range").arg(Arg::new("lower").help("exclusive lower bound")).arg(Arg::new("upper").help("exclusive upper bound")))
        .subcommand(Command::new("defrag").about("Request engine-specific defragmentation"))
        .subcommand(Command::new("engines").about("List registered engine names"))
}

/// What the parsed command line asks the program to do.
pub enum Action {
    Put { key: Vec<u8>, value: Vec<u8> },
    Get { key: Vec<u8> },
    Del { key: Vec<u8> },
    Exists { key: Vec<u8> },
    Count { lower: Option<Vec<u8>>, upper: Option<Vec<u8>> },
    Scan { lower: Option<Vec<u8>>, upper: Option<Vec<u8>> },
    Defrag,
    ListEngines,
}

/// Translate clap's matches for a subcommand into an [`Action`].
pub fn matches_to_action(matches: &clap::ArgMatches) -> Action {
    let bytes = |m: &clap::ArgMatches, name: &str| -> Vec<u8> { m.get_one::<String>(name).expect("required arg").clone().into_bytes() };
    let opt_bytes = |m: &clap::ArgMatches, name: &str| -> Option<Vec<u8>> { m.get_one::<String>(name).map(|s| s.clone().into_bytes()) };

    match matches.subcommand() {
        Some(("put", m)) => Action::Put { key: bytes(m, "key"), value: bytes(m, "value") },
        Some(("get", m)) => Action::Get { key: bytes(m, "key") },
        Some(("del", m)) => Action::Del { key: bytes(m, "key") },
        Some(("exists", m)) => Action::Exists { key: bytes(m, "key") },
        Some(("count", m)) => Action::Count { lower: opt_bytes(m, "lower"), upper: opt_bytes(m, "upper") },
        Some(("scan", m)) => Action::Scan { lower: opt_bytes(m, "lower"), upper: opt_bytes(m, "upper") },
        Some(("defrag", _)) => Action::Defrag,
        Some(("engines", _)) => Action::ListEngines,
        _ => unreachable!("clap enforces subcommand_required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_requires_key_and_value() {
        let matches = build_cli().try_get_matches_from(["kvengine", "put", "k", "v"]).unwrap();
        match matches_to_action(&matches) {
            Action::Put { key, value } => {
                assert_eq!(key, b"k");
                assert_eq!(value, b"v");
            }
            _ => panic!("expected Put"),
        }
    }

    #[test]
    fn count_with_no_bounds_is_count_all() {
        let matches = build_cli().try_get_matches_from(["kvengine", "count"]).unwrap();
        match matches_to_action(&matches) {
            Action::Count { lower, upper } => {
                assert!(lower.is_none());
                assert!(upper.is_none());
            }
            _ => panic!("expected Count"),
        }
    }

    #[test]
    fn scan_with_both_bounds() {
        let matches = build_cli().try_get_matches_from(["kvengine", "scan", "a", "z"]).unwrap();
        match matches_to_action(&matches) {
            Action::Scan { lower, upper } => {
                assert_eq!(lower, Some(b"a".to_vec()));
                assert_eq!(upper, Some(b"z".to_vec()));
            }
            _ => panic!("expected Scan"),
        }
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(build_cli().try_get_matches_from(["kvengine"]).is_err());
    }
}
