//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use sdc_cli::CliError;

fn main() {
    match sdc_cli::run() {
        Ok(()) => {}
        // Help and version output are reported by clap itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("commons-sdc: {err}");
            std::process::exit(1);
        }
    }
}
