use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::request::HeaderSet;
use crate::validator::{STDIN_TARGET, ValidationTarget};

/// Exit code for malformed command lines and unusable configuration
pub const ARGUMENT_ERROR_EXIT: u8 = 3;

/// Validate OpenAPI/Swagger specs against a remote validator service
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-openapi")]
#[command(about = "Validate OpenAPI/Swagger specs using a remote validator service")]
#[command(version)]
pub struct Cli {
    /// Spec files to validate, `-` for standard input (the default)
    #[arg(value_name = "FILE")]
    pub targets: Vec<String>,

    /// Extra request header as "Name: value" (repeatable)
    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        value_parser = parse_header_line,
        action = ArgAction::Append
    )]
    pub headers: Vec<(String, String)>,

    /// Print less output (repeatable)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Print more output (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Validator endpoint
    #[arg(short = 'u', long = "url", value_name = "URL")]
    pub url: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// `-v` count minus `-q` count
    pub fn verbosity_delta(&self) -> i32 {
        i32::from(self.verbose) - i32::from(self.quiet)
    }

    /// Targets as given, standard input when none were
    pub fn targets(&self) -> Vec<ValidationTarget> {
        if self.targets.is_empty() {
            return vec![ValidationTarget::parse(STDIN_TARGET)];
        }
        self.targets
            .iter()
            .map(|argument| ValidationTarget::parse(argument))
            .collect()
    }

    pub fn header_set(&self) -> HeaderSet {
        self.headers.iter().cloned().collect()
    }
}

/// Split `Name: value`. Whitespace around the name and before the value is
/// dropped; the rest of the value is kept as typed.
pub fn parse_header_line(line: &str) -> Result<(String, String), String> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| format!("header {line:?} is missing a ':'"))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!("header {line:?} has an invalid name"));
    }
    Ok((name.to_string(), value.trim_start().to_string()))
}
