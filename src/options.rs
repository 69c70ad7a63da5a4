use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kospel C.MI - read and change electric heater settings over the module's HTTP API
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// HTTP mode: heater API base URL (e.g. http://192.168.1.1/api/dev/65)
    #[clap(long = "url")]
    pub url: Option<String>,

    /// Offline mode: path to a YAML register state file
    #[clap(long = "yaml", value_name = "PATH")]
    pub yaml: Option<PathBuf>,

    /// Registry to use: a built-in name or a path to a registry document
    #[clap(long = "registry")]
    pub registry: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a range of registers and show every interpretation of each
    Scan {
        #[clap(flatten)]
        range: RangeArgs,

        /// Write results to FILE (YAML) instead of printing a table
        #[clap(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Poll a range of registers and print only changes
    Watch {
        #[clap(flatten)]
        range: RangeArgs,

        /// Append change events to FILE (YAML)
        #[clap(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Poll interval in seconds
        #[clap(long = "interval", default_value_t = 2.0, value_name = "SECS")]
        interval: f64,
    },

    /// Print every setting
    Show,

    /// Change settings: NAME VALUE [NAME VALUE ...]
    Set {
        #[clap(required = true, num_args = 2.., value_names = ["NAME", "VALUE"], allow_negative_numbers = true)]
        assignments: Vec<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct RangeArgs {
    /// Starting register address
    #[clap(default_value = "0b00")]
    pub start_register: String,

    /// Number of registers to read
    #[clap(default_value_t = 256)]
    pub count: u16,

    /// Include registers reading 0000
    #[clap(long = "show-empty")]
    pub show_empty: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

impl Command {
    /// Pairs up `set` arguments. `None` if there is a name without a value.
    pub fn assignments(args: &[String]) -> Option<Vec<(&str, &str)>> {
        if args.len() % 2 != 0 {
            return None;
        }
        Some(
            args.chunks(2)
                .map(|pair| (pair[0].as_str(), pair[1].as_str()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scan() {
        let options = Options::parse_from(["kospel", "--yaml", "state.yaml", "scan", "0b50", "16"]);
        assert_eq!(options.yaml, Some(PathBuf::from("state.yaml")));
        match options.command {
            Command::Scan { range, output } => {
                assert_eq!(range.start_register, "0b50");
                assert_eq!(range.count, 16);
                assert!(!range.show_empty);
                assert_eq!(output, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parse_set() {
        let options = Options::parse_from([
            "kospel",
            "--url",
            "http://heater/api/dev/65",
            "set",
            "heater_mode",
            "winter",
            "manual_temperature",
            "22.5",
        ]);
        let Command::Set { assignments } = options.command else {
            panic!("expected set");
        };
        assert_eq!(
            Command::assignments(&assignments),
            Some(vec![("heater_mode", "winter"), ("manual_temperature", "22.5")])
        );
        assert_eq!(Command::assignments(&["x".to_string()]), None);
    }
}
