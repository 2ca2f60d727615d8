use clap::Parser;
use fxforge::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
