use anyhow::Result;
use clap::Parser;
use iptables_gen::plan::example_plan_toml;
use tracing_subscriber::EnvFilter;

mod check_cmd;
mod cli;
mod generate_cmd;
mod path_guard;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate(args) => generate_cmd::run_generate(args),
        Command::Check(args) => check_cmd::run_check(args, cli.verbose),
        Command::Example => {
            print!("{}", example_plan_toml());
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout carries only the script or report.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "iptables_gen=debug,iptables_gen_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
