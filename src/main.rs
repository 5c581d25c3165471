//! wave-probe - print the chunks of WAVE files as JSON
//!
//! ```bash
//! wave-probe take.wav
//! wave-probe --compact --truncate --limit 40 *.wav
//! wave-probe --strict --ignore-vendor session.wav
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wave_probe::{decode_path, render, DecodeOptions, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "wave-probe")]
#[command(about = "Decode the chunks of RIFF/RIFX/RF64/BW64 WAVE files", long_about = None)]
#[command(version)]
struct Args {
    /// Files to probe
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Skip payloads of Pro Tools vendor chunks (minf, elm1, regn, umid, elmo, DGDA, ovwf)
    #[arg(long)]
    ignore_vendor: bool,

    /// Keep null and empty values in the output
    #[arg(long)]
    no_purge: bool,

    /// Cut long strings to --limit characters
    #[arg(long)]
    truncate: bool,

    /// Characters kept by --truncate
    #[arg(long, value_name = "N", default_value_t = 100)]
    limit: usize,

    /// Single-line JSON
    #[arg(short, long)]
    compact: bool,

    /// Exit non-zero when any chunk carries a diagnostic
    #[arg(long)]
    strict: bool,

    /// Log decoding details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut decode_options = DecodeOptions::default();
    if args.ignore_vendor {
        decode_options = decode_options.ignore_vendor_chunks();
    }
    let render_options = RenderOptions {
        purge: !args.no_purge,
        truncate: args.truncate,
        limit: args.limit,
        compact: args.compact,
    };

    let mut failed = false;
    for file in &args.files {
        let document = match decode_path(file, &decode_options) {
            Ok(document) => document,
            Err(e) => {
                eprintln!("Error: Failed to decode '{}': {}", file.display(), e);
                failed = true;
                continue;
            }
        };

        println!("{}", render(&document, &render_options)?);

        if args.strict {
            for (slot, diagnostic) in document.diagnostics() {
                eprintln!("{}: [{slot}] {diagnostic}", file.display());
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
    Ok(())
}
