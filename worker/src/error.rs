use std::{error::Error, fmt, io};

use world::WorldErr;

/// The benchmark's result type.
pub type Result<T> = std::result::Result<T, BenchErr>;

/// Benchmark failures, all of them fatal for the process.
#[derive(Debug)]
pub enum BenchErr {
    Io(io::Error),
    World(WorldErr),
    Config(String),
    Workload(String),
}

impl fmt::Display for BenchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchErr::Io(e) => write!(f, "io error: {e}"),
            BenchErr::World(e) => write!(f, "world error: {e}"),
            BenchErr::Config(msg) => write!(f, "invalid config: {msg}"),
            BenchErr::Workload(msg) => write!(f, "invalid workload: {msg}"),
        }
    }
}

impl Error for BenchErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BenchErr::Io(e) => Some(e),
            BenchErr::World(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BenchErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<WorldErr> for BenchErr {
    fn from(value: WorldErr) -> Self {
        Self::World(value)
    }
}
