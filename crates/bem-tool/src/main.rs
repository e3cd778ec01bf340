//! CLI entry point for the binary encoding map tool.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bem_core as _;
use bem_tool::file::{load_map, render_state, save_map, ToolError};
use bem_tool::view::{render, ViewOptions};
use serde_json as _;
#[cfg(test)]
use tempfile as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: tta-bem <command> [options]

Commands:
  view      <input> [--no-legend] [--no-port-codes]  Print the encoding map report
  check     <input>                                  Load the map and report its width
  normalize <input> [-o <output>]                    Rewrite the map in canonical form

Options:
  -o, --output <file>  Output file path (default: standard output)
  -v, --verbose        Log loading details to stderr
  -h, --help           Show this help message

Examples:
  tta-bem view processor.bem.json
  tta-bem check processor.bem.json
  tta-bem normalize processor.bem.json -o canonical.bem.json
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    View(ViewArgs),
    Check(CheckArgs),
    Normalize(NormalizeArgs),
}

impl Command {
    const fn verbose(&self) -> bool {
        match self {
            Self::View(args) => args.verbose,
            Self::Check(args) => args.verbose,
            Self::Normalize(args) => args.verbose,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ViewArgs {
    input: PathBuf,
    options: ViewOptions,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct CheckArgs {
    input: PathBuf,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct NormalizeArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    verbose: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "view" => parse_view_args(args)
            .map(Command::View)
            .map(ParseResult::Command),
        "check" => parse_check_args(args)
            .map(Command::Check)
            .map(ParseResult::Command),
        "normalize" => parse_normalize_args(args)
            .map(Command::Normalize)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Flags every command accepts, plus the single positional input path.
#[derive(Default)]
struct CommonArgs {
    input: Option<PathBuf>,
    verbose: bool,
}

impl CommonArgs {
    /// Consumes `arg` if it is a common flag or the input path.
    fn accept(&mut self, arg: OsString) -> Result<(), String> {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--verbose" || arg == "-v" {
            self.verbose = true;
            return Ok(());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if self.input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        self.input = Some(PathBuf::from(arg));
        Ok(())
    }

    fn input(self) -> Result<(PathBuf, bool), String> {
        let input = self.input.ok_or_else(|| "missing input path".to_string())?;
        Ok((input, self.verbose))
    }
}

fn parse_view_args(args: impl Iterator<Item = OsString>) -> Result<ViewArgs, String> {
    let mut common = CommonArgs::default();
    let mut options = ViewOptions::default();

    for arg in args {
        if arg == "--no-legend" {
            options.legend = false;
            continue;
        }

        if arg == "--no-port-codes" {
            options.port_codes = false;
            continue;
        }

        common.accept(arg)?;
    }

    let (input, verbose) = common.input()?;
    Ok(ViewArgs {
        input,
        options,
        verbose,
    })
}

fn parse_check_args(args: impl Iterator<Item = OsString>) -> Result<CheckArgs, String> {
    let mut common = CommonArgs::default();

    for arg in args {
        common.accept(arg)?;
    }

    let (input, verbose) = common.input()?;
    Ok(CheckArgs { input, verbose })
}

#[allow(clippy::while_let_on_iterator)]
fn parse_normalize_args(mut args: impl Iterator<Item = OsString>) -> Result<NormalizeArgs, String> {
    let mut common = CommonArgs::default();
    let mut output: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }

        common.accept(arg)?;
    }

    let (input, verbose) = common.input()?;
    Ok(NormalizeArgs {
        input,
        output,
        verbose,
    })
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn report_tool_error(error: &ToolError) -> i32 {
    eprintln!("{error}");
    error.exit_code()
}

fn run_view(args: &ViewArgs) -> Result<(), i32> {
    let bem = load_map(&args.input).map_err(|e| report_tool_error(&e))?;
    print!("{}", render(&bem, &file_name(&args.input), &args.options));
    Ok(())
}

fn run_check(args: &CheckArgs) -> Result<(), i32> {
    let bem = load_map(&args.input).map_err(|e| report_tool_error(&e))?;
    println!(
        "{}: ok: {} bits, {} fields, {} socket code tables",
        args.input.display(),
        bem.width(),
        bem.child_field_count(),
        bem.socket_code_tables().len()
    );
    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<(), i32> {
    let bem = load_map(&args.input).map_err(|e| report_tool_error(&e))?;

    if let Some(output) = args.output {
        save_map(&output, &bem).map_err(|e| report_tool_error(&e))?;
        info!(input = %args.input.display(), output = %output.display(), "map normalized");
        println!("Normalized {} -> {}", args.input.display(), output.display());
        return Ok(());
    }

    let text = render_state(&args.input, &bem).map_err(|e| report_tool_error(&e))?;
    if let Err(e) = io::stdout().write_all(text.as_bytes()) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(command)) => {
            init_logging(command.verbose());
            let result = match command {
                Command::View(args) => run_view(&args),
                Command::Check(args) => run_check(&args),
                Command::Normalize(args) => run_normalize(args),
            };
            match result {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
