use mpi::{environment::Universe, topology::SimpleCommunicator, traits::*};

use crate::{Communicator, ROOT, Result, WorldContext, WorldErr};

/// A world backed by the MPI library the process was started with.
pub struct MpiWorld {
    ctx: WorldContext,
    world: SimpleCommunicator,
    // Dropping the universe finalizes MPI, so it goes last.
    _universe: Universe,
}

impl MpiWorld {
    /// Initializes MPI and reads this process's rank and the world size.
    pub fn init() -> Result<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| WorldErr::Mpi("MPI was already initialized".into()))?;
        let world = universe.world();
        let ctx = WorldContext::new(world.rank() as usize, world.size() as usize)?;

        Ok(Self {
            ctx,
            world,
            _universe: universe,
        })
    }
}

impl Communicator for MpiWorld {
    fn context(&self) -> WorldContext {
        self.ctx
    }

    fn barrier(&mut self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }

    fn gather(&mut self, line: String) -> Result<Option<Vec<String>>> {
        if !self.ctx.is_root() {
            self.world.process_at_rank(ROOT as i32).send(line.as_bytes());
            return Ok(None);
        }

        let mut lines = Vec::with_capacity(self.ctx.size());
        lines.push(line);

        for rank in 1..self.ctx.size() {
            let (bytes, _status) = self.world.process_at_rank(rank as i32).receive_vec::<u8>();
            let line = String::from_utf8(bytes)
                .map_err(|e| WorldErr::Mpi(format!("rank {rank} sent a non utf-8 line: {e}")))?;
            lines.push(line);
        }

        Ok(Some(lines))
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        self.world.barrier();
        Ok(())
    }
}
