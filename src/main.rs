// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for md2json.
//!
//! This binary provides the `md2json` command for converting AI chat
//! transcript exports from Markdown to structured JSON format.

use lexopt::prelude::*;
use md2json::{parser, serializer};
use snafu::prelude::*;
use std::path::{Path, PathBuf};

/// Where to write the JSON document.
enum OutputTarget {
    /// Write to the specified file.
    File(PathBuf),
    /// Write to stdout.
    Stdout,
}

struct Cli {
    input: Option<PathBuf>,
    output: Option<OutputTarget>,
    quiet: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to serialize conversation: {source}"))]
    Serialize { source: serializer::SerializeError },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert AI chat transcript exports to structured JSON

Usage: {name} [OPTIONS] <INPUT> [OUTPUT]

Arguments:
  <INPUT>   Markdown transcript file to convert
  [OUTPUT]  Output JSON file, or - for stdout
            (default: INPUT with .md replaced by .json)

Options:
  -q, --quiet    Suppress progress messages
  -h, --help     Print help
  -V, --version  Print version

The output can be queried with the companion aiquery tool:
  aiquery \"search term\" conversation.json",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<OutputTarget> = None;
    let mut quiet = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('q') | Long("quiet") => quiet = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            Value(val) => {
                let path: PathBuf = val.parse()?;
                output = Some(if path == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::File(path)
                });
            }
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output,
        quiet,
    })
}

/// Derives the default output path: a trailing `.md` is replaced with
/// `.json` (so an input named just `.md` becomes `.json`); otherwise
/// `.json` is appended.
fn output_path(input: &Path) -> PathBuf {
    match input.to_str().and_then(|path| path.strip_suffix(".md")) {
        Some(base) => PathBuf::from(format!("{base}.json")),
        None => {
            let mut name = input.as_os_str().to_owned();
            name.push(".json");
            PathBuf::from(name)
        }
    }
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    let Some(input) = cli.input else {
        print_help();
        std::process::exit(1);
    };

    let text = std::fs::read_to_string(&input).context(ReadFileSnafu { path: &input })?;
    let conversation =
        parser::parse_transcript(&text).context(ParseFileSnafu { path: &input })?;

    if !cli.quiet {
        let metadata = &conversation.metadata;
        eprintln!(
            "Parsed {} blocks ({} messages, {} thoughts)",
            metadata.total_blocks, metadata.messages, metadata.thoughts
        );
        if let Some(timestamp) = &metadata.timestamp {
            eprintln!("Timestamp: {timestamp}");
        }
    }

    match cli.output.unwrap_or_else(|| OutputTarget::File(output_path(&input))) {
        OutputTarget::Stdout => {
            let stdout = std::io::stdout().lock();
            serializer::write_json(&conversation, stdout).context(SerializeSnafu)?;
        }
        OutputTarget::File(path) => {
            // Serialize fully before touching the output file so a failure
            // never leaves a truncated document behind.
            let json = serializer::to_json(&conversation).context(SerializeSnafu)?;
            std::fs::write(&path, json).context(WriteFileSnafu { path: &path })?;
            if !cli.quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}
