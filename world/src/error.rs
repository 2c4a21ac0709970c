use std::{error::Error, fmt, io, time::Duration};

/// The world module's result type.
pub type Result<T> = std::result::Result<T, WorldErr>;

/// Failures of the distributed runtime.
#[derive(Debug)]
pub enum WorldErr {
    Io(io::Error),
    /// The launcher environment is incomplete or malformed.
    Config(String),
    InvalidIdentity {
        rank: usize,
        size: usize,
    },
    ConnectionFailed {
        addr: String,
        source: io::Error,
    },
    /// A connection did not open with a valid `Join`.
    BadHandshake {
        peer: String,
        got: &'static str,
    },
    Timeout {
        waiting_for: &'static str,
        after: Duration,
    },
    UnexpectedMessage {
        rank: usize,
        expected: &'static str,
        got: &'static str,
    },
    SizeMismatch {
        rank: usize,
        expected: usize,
        got: usize,
    },
    DuplicateRank(usize),
    /// The coordinating rank rejected this process.
    Remote(String),
    Mpi(String),
}

impl fmt::Display for WorldErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldErr::Io(e) => write!(f, "io error: {e}"),
            WorldErr::Config(msg) => write!(f, "invalid world config: {msg}"),
            WorldErr::InvalidIdentity { rank, size } => {
                write!(f, "rank {rank} is not valid in a world of size {size}")
            }
            WorldErr::ConnectionFailed { addr, source } => {
                write!(f, "connection failed to {addr}: {source}")
            }
            WorldErr::BadHandshake { peer, got } => {
                write!(f, "connection from {peer} opened with {got} instead of join")
            }
            WorldErr::Timeout { waiting_for, after } => {
                write!(f, "timed out after {after:?} waiting for {waiting_for}")
            }
            WorldErr::UnexpectedMessage {
                rank,
                expected,
                got,
            } => write!(f, "unexpected message from rank {rank}: expected {expected}, got {got}"),
            WorldErr::SizeMismatch {
                rank,
                expected,
                got,
            } => write!(
                f,
                "rank {rank} believes the world has {got} ranks, expected {expected}"
            ),
            WorldErr::DuplicateRank(rank) => write!(f, "rank {rank} joined twice"),
            WorldErr::Remote(msg) => write!(f, "coordinator error: {msg}"),
            WorldErr::Mpi(msg) => write!(f, "mpi error: {msg}"),
        }
    }
}

impl Error for WorldErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldErr::Io(e) => Some(e),
            WorldErr::ConnectionFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for WorldErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
