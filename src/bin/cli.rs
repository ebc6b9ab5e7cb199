use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser};

use bannerscan::{format_json, format_text, BannerBuffer, BannerParser, BannerReport, Matchers};

/// bannerscan CLI — extract a banner from a raw HTTP response.
///
/// Reads a captured HTTP response from a file, --raw string, or stdin, runs
/// the incremental banner scanner over it, and prints the extracted fields
/// (server identity, redirect target, page title).
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP response as a single shell argument.
#[derive(Parser)]
#[command(name = "bannerscan-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP response.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP response string (escape sequences \r \n \t \\ are expanded).
    #[arg(long)]
    raw: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Banner buffer capacity in bytes; longer banners are truncated.
    #[arg(long, default_value = "4096")]
    capacity: usize,

    /// Feed the response in fragments of this many bytes instead of one
    /// call, exercising the resumable context between fragments.
    #[arg(long)]
    chunk_size: Option<usize>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// Structured fields as JSON
    Json,
    /// One "Label: value" line per field
    Text,
    /// The raw banner bytes as emitted by the scanner
    Banner,
}

fn main() {
    let cli = Cli::parse();

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let matchers = match Matchers::compile() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error building pattern tables: {e}");
            process::exit(1);
        }
    };

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    let mut banner = BannerBuffer::new(cli.capacity);
    let mut parser = BannerParser::new(&matchers);

    match cli.chunk_size {
        Some(n) if n > 0 => {
            for chunk in data.chunks(n) {
                parser.feed(chunk, &mut banner);
                if parser.is_done() {
                    break;
                }
            }
        }
        _ => parser.feed(&data, &mut banner),
    }

    match cli.format {
        OutputFormat::Json => {
            let report = BannerReport::from_banner(&banner);
            print!("{}", format_json(&report, cli.pretty));
            println!();
        }
        OutputFormat::Text => {
            let report = BannerReport::from_banner(&banner);
            print!("{}", format_text(&report));
        }
        OutputFormat::Banner => {
            std::io::stdout().write_all(banner.as_bytes()).ok();
            println!();
        }
    }
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
