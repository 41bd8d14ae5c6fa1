use std::io;
use std::path::PathBuf;

use clap::CommandFactory;

#[path = "src/cli.rs"]
mod cli;

/// Man pages land in `$OUT_DIR/man`: `opensesame.1` and one
/// `opensesame-<subcommand>.1` per visible subcommand.
fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("OUT_DIR is only set when run by cargo"))?;
    let man_dir = out_dir.join("man");
    std::fs::create_dir_all(&man_dir)?;

    clap_mangen::generate_to(cli::Cli::command(), &man_dir)
}
