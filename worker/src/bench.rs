use log::info;
use world::Communicator;

use crate::{
    BenchConfig, Result,
    gemv::{Workload, worker_rng},
    report, timer,
};

/// Operation name in the report lines.
pub const OPERATION: &str = "GEMV";

/// Joins the world this process was launched into, runs the benchmark and leaves.
///
/// # Returns
/// The stringified result of the timed GEMV loop.
pub fn launch(config: &BenchConfig) -> Result<String> {
    let mut world = world::init_from_env()?;
    let result = run(world.as_mut(), config)?;
    world.finalize()?;
    Ok(result)
}

/// Runs the benchmark on an already initialized world.
///
/// Rank 0 writes the session header, every rank waits on the barrier, then
/// draws its own workload and times the whole GEMV loop.
///
/// # Arguments
/// * `world` - The world this process belongs to.
/// * `config` - The benchmark parameters.
///
/// # Returns
/// The stringified result of the timed GEMV loop.
pub fn run(world: &mut dyn Communicator, config: &BenchConfig) -> Result<String> {
    let ctx = world.context();

    if ctx.is_root() {
        report::write_header(&config.log_path, ctx.size())?;
    }

    world.barrier()?;
    info!(
        rank = ctx.rank(),
        size = ctx.size(),
        dim = config.size.get(),
        iterations = config.iterations.get();
        "past the barrier, starting"
    );

    let mut rng = worker_rng(config.seed, ctx.rank());
    let workload = Workload::generate(config.size.get(), config.alpha, config.beta, &mut rng)?;

    let sink = report::sink(config.log_mode, &config.log_path);
    let result = timer::timed(ctx, OPERATION, sink.as_ref(), || {
        workload.run(config.iterations)
    })?;

    sink.flush(world)?;
    Ok(result)
}
