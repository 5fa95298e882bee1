//! Command-line arguments for the console transport

mod args;

pub use args::CliArgs;

use clap::Parser;

/// Parse the console transport's command-line arguments
///
/// On invalid input or `--help`, clap prints the message and exits the
/// process; the binary never sees a half-parsed configuration.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
