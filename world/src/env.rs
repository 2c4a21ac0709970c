use std::{env, time::Duration};

use log::info;

use crate::{Communicator, Result, SoloWorld, TcpWorld, WorldContext, WorldErr};

pub const RANK_VAR: &str = "WORLD_RANK";
pub const SIZE_VAR: &str = "WORLD_SIZE";
pub const ADDR_VAR: &str = "WORLD_ADDR";
pub const TIMEOUT_VAR: &str = "WORLD_CONNECT_TIMEOUT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How this process was asked to join a world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEnv {
    /// No launcher involved.
    Solo,
    Tcp {
        ctx: WorldContext,
        addr: String,
        timeout: Duration,
    },
}

impl WorldEnv {
    /// Reads the launcher variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the launcher variables through `lookup`.
    ///
    /// Either all of `WORLD_RANK`, `WORLD_SIZE` and `WORLD_ADDR` are set or
    /// none of them is.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set.
    ///
    /// # Returns
    /// The parsed environment or a `Config` error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = (lookup(RANK_VAR), lookup(SIZE_VAR), lookup(ADDR_VAR));

        let (rank, size, addr) = match vars {
            (None, None, None) => return Ok(Self::Solo),
            (Some(rank), Some(size), Some(addr)) => (rank, size, addr),
            _ => {
                return Err(WorldErr::Config(format!(
                    "{RANK_VAR}, {SIZE_VAR} and {ADDR_VAR} must be set together"
                )));
            }
        };

        let rank = parse_var(RANK_VAR, &rank)?;
        let size = parse_var(SIZE_VAR, &size)?;
        let timeout = match lookup(TIMEOUT_VAR) {
            Some(secs) => Duration::from_secs(parse_var(TIMEOUT_VAR, &secs)?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self::Tcp {
            ctx: WorldContext::new(rank, size)?,
            addr,
            timeout,
        })
    }

    /// Joins the described world.
    pub fn init(self) -> Result<Box<dyn Communicator>> {
        match self {
            Self::Solo => Self::init_solo(),
            Self::Tcp { ctx, addr, timeout } => {
                info!(rank = ctx.rank(), size = ctx.size(); "joining tcp world");
                Ok(Box::new(TcpWorld::join(ctx, &addr, timeout)?))
            }
        }
    }

    #[cfg(not(feature = "mpi"))]
    fn init_solo() -> Result<Box<dyn Communicator>> {
        info!("no launcher environment, running alone");
        Ok(Box::new(SoloWorld::new()))
    }

    /// Without the tcp launcher variables the process is assumed to be started by `mpirun`.
    #[cfg(feature = "mpi")]
    fn init_solo() -> Result<Box<dyn Communicator>> {
        info!("no launcher environment, initializing mpi");
        Ok(Box::new(crate::MpiWorld::init()?))
    }
}

/// Initializes the world this process was launched into.
///
/// # Returns
/// The joined world, or an error if the environment is malformed or the
/// world could not be assembled.
pub fn init_from_env() -> Result<Box<dyn Communicator>> {
    WorldEnv::from_env()?.init()
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| WorldErr::Config(format!("{key} has an invalid value {value:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn no_vars_is_solo() {
        assert_eq!(WorldEnv::from_lookup(lookup(&[])).unwrap(), WorldEnv::Solo);
    }

    #[test]
    fn all_vars_is_tcp() {
        let env = WorldEnv::from_lookup(lookup(&[
            (RANK_VAR, "2"),
            (SIZE_VAR, "4"),
            (ADDR_VAR, "127.0.0.1:47000"),
            (TIMEOUT_VAR, "5"),
        ]))
        .unwrap();

        assert_eq!(
            env,
            WorldEnv::Tcp {
                ctx: WorldContext::new(2, 4).unwrap(),
                addr: "127.0.0.1:47000".into(),
                timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn timeout_defaults() {
        let env = WorldEnv::from_lookup(lookup(&[
            (RANK_VAR, "0"),
            (SIZE_VAR, "1"),
            (ADDR_VAR, "127.0.0.1:47000"),
        ]))
        .unwrap();

        let WorldEnv::Tcp { timeout, .. } = env else {
            panic!("expected a tcp world");
        };
        assert_eq!(timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn partial_vars_are_rejected() {
        let err = WorldEnv::from_lookup(lookup(&[(RANK_VAR, "0")])).unwrap_err();
        assert!(matches!(err, WorldErr::Config(_)));
    }

    #[test]
    fn garbage_rank_is_rejected() {
        let err = WorldEnv::from_lookup(lookup(&[
            (RANK_VAR, "first"),
            (SIZE_VAR, "4"),
            (ADDR_VAR, "127.0.0.1:47000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorldErr::Config(_)));
    }

    #[test]
    fn rank_outside_world_is_rejected() {
        let err = WorldEnv::from_lookup(lookup(&[
            (RANK_VAR, "4"),
            (SIZE_VAR, "4"),
            (ADDR_VAR, "127.0.0.1:47000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorldErr::InvalidIdentity { rank: 4, size: 4 }));
    }
}
