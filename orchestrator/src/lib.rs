pub mod error;

use std::{
    ffi::OsString,
    num::NonZeroUsize,
    process::{Child, Command},
    time::Duration,
};

use log::{info, warn};
use world::{ADDR_VAR, RANK_VAR, SIZE_VAR, TIMEOUT_VAR};

pub use error::LaunchErr;

/// Where rank 0 listens unless told otherwise.
pub const DEFAULT_ADDR: &str = "127.0.0.1:47000";

/// Result type of the launcher.
pub type Result<T> = std::result::Result<T, LaunchErr>;

/// What to launch and how many times.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub ranks: NonZeroUsize,
    /// The address rank 0 listens on and every other rank connects to.
    pub addr: String,
    pub connect_timeout: Option<Duration>,
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl LaunchConfig {
    /// The environment the worker with the given `rank` is started with, on
    /// top of the launcher's own.
    pub fn rank_env(&self, rank: usize) -> Vec<(&'static str, String)> {
        let mut env = vec![
            (RANK_VAR, rank.to_string()),
            (SIZE_VAR, self.ranks.to_string()),
            (ADDR_VAR, self.addr.clone()),
        ];

        if let Some(timeout) = self.connect_timeout {
            env.push((TIMEOUT_VAR, timeout.as_secs().to_string()));
        }

        env
    }
}

/// Starts every rank of the group and waits for all of them to exit.
///
/// # Arguments
/// * `config` - The program to start and the shape of the group.
///
/// # Errors
/// `Spawn` if any rank could not be started, the ranks already started are
/// killed. `RanksFailed` naming every rank that exited unsuccessfully.
pub fn launch(config: &LaunchConfig) -> Result<()> {
    let size = config.ranks.get();
    let mut children: Vec<(usize, Child)> = Vec::with_capacity(size);

    for rank in 0..size {
        let spawned = Command::new(&config.program)
            .args(&config.args)
            .envs(config.rank_env(rank))
            .spawn();

        match spawned {
            Ok(child) => {
                info!(rank = rank, pid = child.id(); "worker spawned");
                children.push((rank, child));
            }
            Err(source) => {
                kill_all(&mut children);
                return Err(LaunchErr::Spawn {
                    rank,
                    program: config.program.clone(),
                    source,
                });
            }
        }
    }

    let mut failed = Vec::new();

    for (rank, mut child) in children {
        let status = child.wait()?;

        if status.success() {
            info!(rank = rank; "worker finished");
        } else {
            warn!(rank = rank; "worker exited with {status}");
            failed.push((rank, status));
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(LaunchErr::RanksFailed(failed))
    }
}

fn kill_all(children: &mut [(usize, Child)]) {
    for (rank, child) in children {
        if let Err(e) = child.kill().and_then(|_| child.wait().map(drop)) {
            warn!(rank = *rank; "failed to stop worker: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ranks: usize, program: &str, args: &[&str]) -> LaunchConfig {
        LaunchConfig {
            ranks: NonZeroUsize::new(ranks).unwrap(),
            addr: DEFAULT_ADDR.into(),
            connect_timeout: None,
            program: program.into(),
            args: args.iter().map(OsString::from).collect(),
        }
    }

    #[test]
    fn every_rank_gets_its_identity() {
        let mut config = config(4, "worker", &[]);
        config.connect_timeout = Some(Duration::from_secs(5));

        assert_eq!(
            config.rank_env(2),
            vec![
                (RANK_VAR, "2".to_string()),
                (SIZE_VAR, "4".to_string()),
                (ADDR_VAR, DEFAULT_ADDR.to_string()),
                (TIMEOUT_VAR, "5".to_string()),
            ]
        );
    }

    #[test]
    fn timeout_is_omitted_when_unset() {
        let config = config(1, "worker", &[]);
        assert!(config.rank_env(0).iter().all(|(key, _)| *key != TIMEOUT_VAR));
    }

    #[cfg(unix)]
    #[test]
    fn launches_every_rank() {
        let script = r#"test "$WORLD_RANK" -lt "$WORLD_SIZE" && test "$WORLD_SIZE" = 3"#;
        launch(&config(3, "sh", &["-c", script])).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn failed_ranks_are_named() {
        let err = launch(&config(3, "sh", &["-c", "exit $WORLD_RANK"])).unwrap_err();

        let LaunchErr::RanksFailed(failed) = err else {
            panic!("expected failed ranks");
        };
        let ranks: Vec<_> = failed.iter().map(|(rank, _)| *rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(failed[0].1.code(), Some(1));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let err = launch(&config(2, "./definitely-not-a-worker-binary", &[])).unwrap_err();
        assert!(matches!(err, LaunchErr::Spawn { rank: 0, .. }));
    }
}
