use crate::{Result, WorldErr};

/// The rank that writes the session header and collects the reports.
pub const ROOT: usize = 0;

/// Identity of this process inside the worker group.
///
/// Assigned once when the world is initialized and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldContext {
    rank: usize,
    size: usize,
}

impl WorldContext {
    /// Creates a new `WorldContext`.
    ///
    /// # Arguments
    /// * `rank` - Zero based index of this process.
    /// * `size` - Amount of processes in the group.
    ///
    /// # Returns
    /// An error if `size` is zero or `rank` is not below `size`.
    pub fn new(rank: usize, size: usize) -> Result<Self> {
        if rank >= size {
            return Err(WorldErr::InvalidIdentity { rank, size });
        }

        Ok(Self { rank, size })
    }

    /// The context of a world with a single process.
    pub fn solo() -> Self {
        Self { rank: ROOT, size: 1 }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this process is the coordinating rank.
    pub fn is_root(&self) -> bool {
        self.rank == ROOT
    }
}
