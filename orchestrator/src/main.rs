use std::{ffi::OsString, num::NonZeroUsize, time::Duration};

use anyhow::Context;
use clap::Parser;
use orchestrator::{DEFAULT_ADDR, LaunchConfig, launch};

#[derive(Parser, Debug)]
#[command(version, about = "Starts a group of benchmark workers and waits for them")]
struct Args {
    /// Number of worker processes
    #[arg(short = 'n', long = "np", value_name = "N")]
    ranks: NonZeroUsize,

    /// Address rank 0 listens on
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Seconds the workers wait for each other to connect
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u64>,

    /// The worker program followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Args {
        ranks,
        addr,
        connect_timeout,
        mut command,
    } = Args::parse();

    let program = command.remove(0);
    let config = LaunchConfig {
        ranks,
        addr,
        connect_timeout: connect_timeout.map(Duration::from_secs),
        program,
        args: command,
    };

    launch(&config).with_context(|| format!("launching {} worker(s)", config.ranks))?;
    Ok(())
}
