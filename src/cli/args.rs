//! CLI argument parsing using clap.

use clap::{
    Parser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::ffi::OsString;

use crate::operation::OperationKind;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Rules are read from config.json in the current directory:

  {
    \"file\": [
      { \"extensions\": [\".pdf\"], \"watch\": \"/home/me/Downloads\", \"destination\": \"/home/me/Documents\" }
    ]
  }

Stop with Ctrl-C.";

/// Directory-watching file organizer
#[derive(Parser, Debug)]
#[command(
    name = "watchsort",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch directories and move, copy or delete new files by extension",
    after_help = AFTER_HELP,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Operation applied to matching files: move, copy, delete
    #[arg(short = 't', long = "type", value_name = "OPERATION")]
    pub operation: OperationKind,
}

impl Cli {
    /// Parse process arguments, accepting the single-dash `-type` spelling.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrite `-type` / `-type=VALUE` into `--type` / `--type=VALUE`.
///
/// Without this clap reads `-type` as `-t ype`. Arguments after `--` are
/// left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut escaped = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if escaped {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    escaped = true;
                    arg
                }
                Some("-type") => OsString::from("--type"),
                Some(s) if s.starts_with("-type=") => OsString::from(format!("-{s}")),
                _ => arg,
            }
        })
        .collect()
}
