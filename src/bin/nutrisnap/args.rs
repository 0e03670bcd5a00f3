use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Serve { port: Option<u16> },
    Estimate(EstimateArgs),
    Help,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EstimateArgs {
    pub image: PathBuf,
    pub samples: Option<usize>,     // -n/--samples
    pub quorum: Option<usize>,      // -q/--quorum
    pub timeout_secs: Option<u64>,  // -t/--timeout
    pub model: Option<String>,      // -m/--model
    pub json_output: bool,          // --json
}

pub const USAGE: &str = "\
Usage:
  nutrisnap [serve] [-p PORT]
  nutrisnap estimate <IMAGE> [-n SAMPLES] [-q QUORUM] [-t TIMEOUT_SECS] [-m MODEL] [--json]";

impl Command {
    /// Parse command-line arguments
    pub fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(&args[1..])
    }

    /// Parse from a slice of arguments (for testing)
    pub fn parse_from(args: &[String]) -> Result<Self> {
        match args.first().map(String::as_str) {
            None => Ok(Command::Serve { port: None }),
            Some("-h" | "--help" | "help") => Ok(Command::Help),
            Some("serve") => parse_serve(&args[1..]),
            Some("estimate") => parse_estimate(&args[1..]).map(Command::Estimate),
            Some(flag) if flag.starts_with('-') => parse_serve(args),
            Some(unknown) => Err(anyhow!("Unknown command: {unknown}")),
        }
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| anyhow!("{flag} expects a number, got {raw}"))
}

fn parse_serve(args: &[String]) -> Result<Command> {
    let mut port = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-p" | "--port" => {
                i += 1;
                port = Some(number(value(args, i, arg)?, arg)?);
            }
            unknown => return Err(anyhow!("Unknown argument: {unknown}")),
        }
        i += 1;
    }
    Ok(Command::Serve { port })
}

fn parse_estimate(args: &[String]) -> Result<EstimateArgs> {
    let mut result = EstimateArgs::default();
    let mut image = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "-n" | "--samples" => {
                i += 1;
                result.samples = Some(number(value(args, i, arg)?, arg)?);
            }
            "-q" | "--quorum" => {
                i += 1;
                result.quorum = Some(number(value(args, i, arg)?, arg)?);
            }
            "-t" | "--timeout" => {
                i += 1;
                result.timeout_secs = Some(number(value(args, i, arg)?, arg)?);
            }
            "-m" | "--model" => {
                i += 1;
                result.model = Some(value(args, i, arg)?.to_string());
            }
            "--json" => {
                result.json_output = true;
            }
            flag if flag.starts_with('-') => {
                return Err(anyhow!("Unknown argument: {flag}"));
            }
            path => {
                if image.replace(PathBuf::from(path)).is_some() {
                    return Err(anyhow!("Only one image path may be given"));
                }
            }
        }

        i += 1;
    }

    result.image = image.ok_or_else(|| anyhow!("estimate requires an image path"))?;
    Ok(result)
}
