use std::{ffi::OsString, fmt, process::ExitStatus};

/// All errors that can occur while launching the worker group.
#[derive(Debug)]
pub enum LaunchErr {
    /// A worker process could not be started.
    Spawn {
        rank: usize,
        program: OsString,
        source: std::io::Error,
    },
    /// Some workers exited unsuccessfully.
    RanksFailed(Vec<(usize, ExitStatus)>),
    /// An underlying I/O error not covered by the above variants.
    Io(std::io::Error),
}

impl fmt::Display for LaunchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn {
                rank,
                program,
                source,
            } => write!(f, "failed to spawn rank {rank} ({}): {source}", program.to_string_lossy()),
            Self::RanksFailed(failed) => {
                write!(f, "{} rank(s) failed:", failed.len())?;
                for (rank, status) in failed {
                    write!(f, " rank {rank} ({status})")?;
                }
                Ok(())
            }
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for LaunchErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LaunchErr {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
