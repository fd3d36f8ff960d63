//! `json-cycle-normalize`: re-encode a document with canonical paths.
//!
//! Usage:
//!   json-cycle-normalize < document.json
//!
//! References in the output point at the first occurrence of each value in
//! document order.

use json_cycle::cli::normalize;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match normalize(buf.trim()) {
        Ok(result) => {
            if let Err(e) = writeln!(io::stdout().lock(), "{result}") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
