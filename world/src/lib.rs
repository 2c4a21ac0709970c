//! The distributed runtime every benchmark process joins at startup.
//!
//! A world gives each process its identity (rank and size) and the few
//! collective operations the benchmark needs: a barrier before the timed
//! region, a gather of report lines on the coordinating rank and a final
//! teardown.

mod context;
mod env;
pub mod error;
#[cfg(feature = "mpi")]
mod mpi_world;
mod solo;
mod tcp;

pub use context::{ROOT, WorldContext};
pub use env::{ADDR_VAR, RANK_VAR, SIZE_VAR, TIMEOUT_VAR, WorldEnv, init_from_env};
pub use error::{Result, WorldErr};
#[cfg(feature = "mpi")]
pub use mpi_world::MpiWorld;
pub use solo::SoloWorld;
pub use tcp::TcpWorld;

/// Collective operations over a group of processes.
///
/// Every method except `context` is collective: all ranks of the world must
/// call it, in the same order, for any of them to return.
pub trait Communicator {
    /// The identity of this process.
    fn context(&self) -> WorldContext;

    /// Blocks until every rank of the world has entered the barrier.
    fn barrier(&mut self) -> Result<()>;

    /// Collects one line from every rank on the coordinating rank.
    ///
    /// # Arguments
    /// * `line` - This rank's contribution.
    ///
    /// # Returns
    /// `Some` with the lines in rank order on the coordinating rank, `None` elsewhere.
    fn gather(&mut self, line: String) -> Result<Option<Vec<String>>>;

    /// Tears the world down once every rank is done with it.
    fn finalize(self: Box<Self>) -> Result<()>;
}
