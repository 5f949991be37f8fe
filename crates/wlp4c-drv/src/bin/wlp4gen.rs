//! The WLP4 compiler: WLP4 source on stdin, MIPS assembly on stdout.

use anyhow::Result;
use std::io::Read;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        // Downstream tooling greps for this marker.
        eprintln!("ERROR");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source)?;
    let asm = wlp4c_drv::compile(&source)?;
    print!("{asm}");
    Ok(())
}
