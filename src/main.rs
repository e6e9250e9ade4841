use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod chunk;

/// Printed on its own line between message chunks.
const CHUNK_SEPARATOR: &str = "----- 8< -----";

#[derive(Parser)]
#[command(name = "mdv2")]
#[command(about = "Convert Markdown to Telegram MarkdownV2")]
struct Cli {
    /// Input Markdown file (stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// TOML config file overriding the compiled defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum characters per message (defaults to the config value)
    #[arg(long)]
    max_len: Option<usize>,

    /// Use the pattern scanner instead of the CommonMark renderer
    #[arg(long)]
    patterns: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => mdv2::Config::load(path),
        None => mdv2::Config::compiled_default(),
    };

    // Read input
    let bytes = match read_input(cli.input.as_deref()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            std::process::exit(1);
        }
    };

    let markdown = match std::str::from_utf8(&bytes) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {}", mdv2::Error::from(e));
            std::process::exit(1);
        }
    };

    // Convert
    let rendered = if cli.patterns {
        mdv2::transform_spans_with_config(markdown, &config)
    } else {
        mdv2::transform_or_escape_with_config(markdown, &config)
    };

    let max_len = cli.max_len.unwrap_or(config.output.max_message_len);
    let chunks = chunk::split_message(&rendered, max_len);
    tracing::debug!(chunks = chunks.len(), max_len, "split rendered message");

    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            println!("{}", CHUNK_SEPARATOR);
        }
        println!("{}", chunk);
    }
}

fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => fs::read(path),
        _ => {
            let mut bytes = Vec::new();
            io::stdin().read_to_end(&mut bytes)?;
            Ok(bytes)
        }
    }
}
