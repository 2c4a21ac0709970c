use anyhow::Context;
use worker::{BenchConfig, bench};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = BenchConfig::from_env().context("reading the benchmark config")?;
    bench::launch(&config).context("running the benchmark")?;

    Ok(())
}
