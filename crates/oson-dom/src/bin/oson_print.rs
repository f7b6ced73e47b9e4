//! `oson-print`: print an OSON image (stdin) as JSON text (stdout).
//!
//! Usage:
//!   oson-print [--pretty] [--sort | --optimize] [--ascii] [--numformat] [--validate]

use std::io::{self, Read, Write};
use std::process;

use oson_dom::config::{DomFlags, DomOptions};
use oson_dom::oson::OsonEventSource;
use oson_dom::print::{events_to_string, PrintFlags, PrintOptions, SortMode};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut print = PrintOptions::default();
    let mut dom = DomOptions::binary();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--pretty" => print.flags |= PrintFlags::PRETTY,
            "--ascii" => print.flags |= PrintFlags::ASCII,
            "--numformat" => print.flags |= PrintFlags::NUMFORMAT,
            "--sort" => print.sort = SortMode::KeyName,
            "--optimize" => print.sort = SortMode::Optimize,
            "--validate" => dom = dom.with_flags(DomFlags::VALIDATE | DomFlags::VALIDATE_STRINGS),
            other => {
                eprintln!("Unknown option: {other}");
                process::exit(2);
            }
        }
    }

    let mut image = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut image) {
        eprintln!("{e}");
        process::exit(1);
    }
    debug!(bytes = image.len(), "read OSON image");

    let text = OsonEventSource::new(image, &dom)
        .and_then(|mut source| events_to_string(&mut source, print));
    match text {
        Ok(text) => {
            let mut stdout = io::stdout();
            if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.write_all(b"\n")) {
                eprintln!("{e}");
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
