//! The assembler: MIPS assembly on stdin, raw big-endian words on stdout.

use anyhow::Result;
use std::io::{Read, Write};

fn main() {
    if let Err(err) = run() {
        // Exactly one diagnostic line per run.
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source)?;
    let bytes = wlp4c_drv::assemble(&source)?;
    std::io::stdout().write_all(&bytes)?;
    Ok(())
}
