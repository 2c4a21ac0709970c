use std::{borrow::Cow, net, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg},
};
use log::{debug, info};
use tokio::{
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    runtime::{Builder, Runtime},
    time::{self, Instant},
};

use crate::{Communicator, ROOT, Result, WorldContext, WorldErr};

type NetRx = OnoReceiver<OwnedReadHalf>;
type NetTx = OnoSender<OwnedWriteHalf>;

const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// One end of a connection between the coordinating rank and another rank.
struct Link {
    rank: usize,
    rx: NetRx,
    tx: NetTx,
}

enum Role {
    /// Links to ranks `1..size`, in rank order.
    Coordinator(Vec<Link>),
    /// The link to the coordinating rank.
    Member(Link),
}

/// A world whose ranks talk over TCP, in a star around the coordinating rank.
///
/// Rank 0 listens and every other rank connects to it. The collectives are
/// implemented as message exchanges through rank 0. Each instance owns a
/// small tokio runtime and blocks on it, so the `Communicator` calls are
/// synchronous like their MPI counterparts.
pub struct TcpWorld {
    ctx: WorldContext,
    runtime: Runtime,
    role: Role,
    buf: Vec<u8>,
}

impl TcpWorld {
    /// Joins the world at `addr`.
    ///
    /// The coordinating rank binds `addr` and waits for the rest of the ranks,
    /// every other rank connects to it, retrying until `timeout` elapses.
    ///
    /// # Arguments
    /// * `ctx` - The identity of this process.
    /// * `addr` - The network address of the coordinating rank.
    /// * `timeout` - How long to wait for the world to assemble.
    ///
    /// # Returns
    /// The joined world or an error if the handshake failed.
    pub fn join(ctx: WorldContext, addr: &str, timeout: Duration) -> Result<Self> {
        let runtime = Self::runtime()?;

        let role = if ctx.is_root() {
            runtime.block_on(async {
                let listener =
                    TcpListener::bind(addr)
                        .await
                        .map_err(|source| WorldErr::ConnectionFailed {
                            addr: addr.to_string(),
                            source,
                        })?;

                info!(addr = addr, size = ctx.size(); "coordinator listening");
                accept_members(listener, ctx.size(), timeout).await
            })?
        } else {
            runtime.block_on(join_coordinator(ctx, addr, timeout))?
        };

        Ok(Self::from_parts(ctx, runtime, role))
    }

    /// Starts the coordinating rank on an already bound listener.
    ///
    /// # Arguments
    /// * `listener` - Where the other ranks will connect to.
    /// * `size` - The amount of ranks in the world, this one included.
    /// * `timeout` - How long to wait for the world to assemble.
    ///
    /// # Returns
    /// The coordinating rank's world once every other rank has joined.
    pub fn coordinator(listener: net::TcpListener, size: usize, timeout: Duration) -> Result<Self> {
        let ctx = WorldContext::new(ROOT, size)?;
        let runtime = Self::runtime()?;
        listener.set_nonblocking(true)?;

        let role = runtime.block_on(async {
            let listener = TcpListener::from_std(listener)?;
            accept_members(listener, size, timeout).await
        })?;

        Ok(Self::from_parts(ctx, runtime, role))
    }

    fn from_parts(ctx: WorldContext, runtime: Runtime, role: Role) -> Self {
        Self {
            ctx,
            runtime,
            role,
            buf: Vec::new(),
        }
    }

    fn runtime() -> Result<Runtime> {
        Ok(Builder::new_current_thread().enable_all().build()?)
    }
}

impl Communicator for TcpWorld {
    fn context(&self) -> WorldContext {
        self.ctx
    }

    fn barrier(&mut self) -> Result<()> {
        let Self {
            runtime, role, buf, ..
        } = self;

        runtime.block_on(async {
            match role {
                Role::Coordinator(members) => {
                    for member in members.iter_mut() {
                        expect_signal(member, buf, Command::Arrive).await?;
                    }

                    debug!(size = members.len() + 1; "every rank arrived, releasing");
                    for member in members.iter_mut() {
                        member.tx.send(&Msg::Control(Command::Release)).await?;
                    }
                }
                Role::Member(coordinator) => {
                    coordinator.tx.send(&Msg::Control(Command::Arrive)).await?;
                    expect_signal(coordinator, buf, Command::Release).await?;
                }
            }

            Ok::<_, WorldErr>(())
        })
    }

    fn gather(&mut self, line: String) -> Result<Option<Vec<String>>> {
        let Self {
            runtime, role, buf, ..
        } = self;

        runtime.block_on(async {
            match role {
                Role::Coordinator(members) => {
                    let mut lines = Vec::with_capacity(members.len() + 1);
                    lines.push(line);

                    for member in members.iter_mut() {
                        match recv_command(member, buf).await? {
                            Command::Report { line } => lines.push(line),
                            other => return Err(unexpected(member.rank, "report", &other)),
                        }
                    }

                    Ok::<_, WorldErr>(Some(lines))
                }
                Role::Member(coordinator) => {
                    let msg = Msg::Control(Command::Report { line });
                    coordinator.tx.send(&msg).await?;
                    Ok(None)
                }
            }
        })
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        let TcpWorld {
            ctx,
            runtime,
            mut role,
            mut buf,
        } = *self;

        runtime.block_on(async {
            match &mut role {
                Role::Coordinator(members) => {
                    for member in members.iter_mut() {
                        expect_signal(member, &mut buf, Command::Disconnect).await?;
                    }
                }
                Role::Member(coordinator) => {
                    coordinator.tx.send(&Msg::Control(Command::Disconnect)).await?;
                    coordinator.tx.close().await?;
                }
            }

            Ok::<_, WorldErr>(())
        })?;

        debug!(rank = ctx.rank(); "left the world");
        Ok(())
    }
}

/// Accepts ranks `1..size` and validates their `Join` messages.
async fn accept_members(listener: TcpListener, size: usize, timeout: Duration) -> Result<Role> {
    let mut slots: Vec<Option<Link>> = (1..size).map(|_| None).collect();
    let mut buf = Vec::new();
    let deadline = Instant::now() + timeout;

    for _ in 1..size {
        let (stream, peer) = time::timeout_at(deadline, listener.accept())
            .await
            .map_err(|_| WorldErr::Timeout {
                waiting_for: "ranks to join",
                after: timeout,
            })??;

        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        let join = time::timeout_at(deadline, rx.recv_into(&mut buf))
            .await
            .map_err(|_| WorldErr::Timeout {
                waiting_for: "join",
                after: timeout,
            })??;

        let (rank, got) = match join {
            Msg::Control(Command::Join { rank, size }) => (rank, size),
            msg => {
                return Err(WorldErr::BadHandshake {
                    peer: peer.to_string(),
                    got: msg.kind(),
                });
            }
        };

        let rejection = if got != size {
            Some(WorldErr::SizeMismatch {
                rank,
                expected: size,
                got,
            })
        } else if rank == ROOT || rank >= size {
            Some(WorldErr::InvalidIdentity { rank, size })
        } else if slots[rank - 1].is_some() {
            Some(WorldErr::DuplicateRank(rank))
        } else {
            None
        };

        if let Some(err) = rejection {
            let text = err.to_string();
            // The rejected rank may already be gone, the local error is what matters.
            let _ = tx.send(&Msg::Err(Cow::Borrowed(&text))).await;
            return Err(err);
        }

        debug!(rank = rank, peer:% = peer; "rank joined");
        slots[rank - 1] = Some(Link { rank, rx, tx });
    }

    Ok(Role::Coordinator(slots.into_iter().flatten().collect()))
}

/// Connects to the coordinating rank and introduces this process.
async fn join_coordinator(ctx: WorldContext, addr: &str, timeout: Duration) -> Result<Role> {
    let stream = connect_with_retry(addr, timeout).await?;
    stream.set_nodelay(true)?;

    let (rx, tx) = stream.into_split();
    let (rx, mut tx) = comms::channel(rx, tx);

    let join = Msg::Control(Command::Join {
        rank: ctx.rank(),
        size: ctx.size(),
    });
    tx.send(&join).await?;
    debug!(rank = ctx.rank(), addr = addr; "joined coordinator");

    Ok(Role::Member(Link { rank: ROOT, rx, tx }))
}

async fn connect_with_retry(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let deadline = Instant::now() + timeout;

    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() + RETRY_INTERVAL < deadline => {
                debug!(addr = addr; "coordinator not reachable yet: {e}, retrying");
                time::sleep(RETRY_INTERVAL).await;
            }
            Err(source) => {
                return Err(WorldErr::ConnectionFailed {
                    addr: addr.to_string(),
                    source,
                });
            }
        }
    }
}

async fn recv_command(link: &mut Link, buf: &mut Vec<u8>) -> Result<Command> {
    match link.rx.recv_into(buf).await? {
        Msg::Control(cmd) => Ok(cmd),
        Msg::Err(text) => Err(WorldErr::Remote(text.into_owned())),
    }
}

async fn expect_signal(link: &mut Link, buf: &mut Vec<u8>, signal: Command) -> Result<()> {
    let cmd = recv_command(link, buf).await?;

    if cmd == signal {
        Ok(())
    } else {
        Err(unexpected(link.rank, signal.kind(), &cmd))
    }
}

fn unexpected(rank: usize, expected: &'static str, got: &Command) -> WorldErr {
    WorldErr::UnexpectedMessage {
        rank,
        expected,
        got: got.kind(),
    }
}
