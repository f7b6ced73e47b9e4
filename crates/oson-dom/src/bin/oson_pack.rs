//! `oson-pack`: encode JSON text (stdin) as an OSON image (stdout).
//!
//! Usage:
//!   oson-pack [--stream] [--no-sort] [--lax] [--native-numbers]

use std::io::{self, Read, Write};
use std::process;

use oson_dom::config::{NumberEncoding, ParseOptions};
use oson_dom::oson::{encode_events, EncodeOptions};
use oson_dom::text::JsonTextSource;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut encode = EncodeOptions::default();
    let mut parse = ParseOptions::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--stream" => encode.streaming = true,
            "--no-sort" => encode.sort_field_ids = false,
            "--lax" => parse = ParseOptions::lax().with_numbers(parse.numbers),
            "--native-numbers" => {
                parse.numbers = NumberEncoding::Native;
                encode.numbers = NumberEncoding::Native;
            }
            other => {
                eprintln!("Unknown option: {other}");
                process::exit(2);
            }
        }
    }

    let mut input = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut input) {
        eprintln!("{e}");
        process::exit(1);
    }
    debug!(bytes = input.len(), "read JSON text");

    let image = JsonTextSource::from_bytes(input, parse)
        .and_then(|mut source| encode_events(&mut source, &encode));
    match image {
        Ok(bytes) => {
            if let Err(e) = io::stdout().write_all(&bytes) {
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
