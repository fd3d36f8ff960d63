//! `json-cycle-path`: resolve a reference path in an encoded document.
//!
//! Usage:
//!   json-cycle-path '<path>'
//!
//! The document is read from stdin and may contain `$ref` markers. The path
//! is the first argument, e.g. `$["books"][0]`. The target is printed
//! encoded on its own. Set `RUST_LOG=debug` to trace the passes on stderr.

use json_cycle::cli::lookup_path;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let path = match args.get(1) {
        Some(p) => p.clone(),
        None => {
            eprintln!("First argument must be a reference path.");
            std::process::exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let result = match lookup_path(buf.trim(), &path) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{result}") {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
