//! The per-worker client: one connection per worker execution context.
//!
//! A [`WorkerClient`] is owned by exactly one worker and never shared, which
//! is what lets the transport run without any per-command locking. The
//! connection is opened lazily on the first command and closed when the
//! worker drops its client.

use crate::cmd::Command;
use crate::config::{Config, Registry};
use crate::connection::Connection;
use crate::frame::Frame;
use crate::workspace::Workspace;
use crate::Error;
use bytes::Bytes;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

/// A client bound to a single worker execution context.
///
/// Commands go through [`execute`](WorkerClient::execute) (one reply per
/// command) or a [`Pipeline`] (batched submission, deferred collection).
/// When the peer closes the stream mid-call, `execute` reconnects and
/// retries exactly once; any other failure is reported without retry.
#[derive(Debug)]
pub struct WorkerClient {
    registry: Arc<Registry>,
    slot: Option<Handle>,
}

/// A live connection plus the transport state last observed on it.
#[derive(Debug)]
struct Handle {
    conn: Connection,

    /// Set once the peer is seen closing the stream. Gates the reconnect
    /// health check at pipeline start.
    saw_eof: bool,
}

impl Handle {
    fn new(conn: Connection) -> Handle {
        Handle {
            conn,
            saw_eof: false,
        }
    }
}

impl WorkerClient {
    /// Create a client reading its connection settings from `registry`.
    ///
    /// No connection is opened yet; that happens on the first command.
    pub fn new(registry: Arc<Registry>) -> WorkerClient {
        WorkerClient {
            registry,
            slot: None,
        }
    }

    /// Issue one command and return its reply as text.
    ///
    /// `Ok(None)` is the server's nil — "no value" — and is distinct from
    /// both the empty string (`Ok(Some(b""))`) and failure (`Err`). A server
    /// error reply (`-ERR …`) is a *successful* call whose result is the
    /// error text. Array replies are summarized as the literal text `array`;
    /// callers needing structured arrays are out of scope.
    ///
    /// All returned text is materialized into `ws`, never borrowed from
    /// reply buffers.
    #[instrument(skip(self, ws))]
    pub async fn execute(&mut self, ws: &mut Workspace, cmd: &Command) -> crate::Result<Option<Bytes>> {
        let reply = self.call(&cmd.to_frame()).await?;

        Ok(render(ws, reply))
    }

    /// Issue one command and discard its reply.
    ///
    /// Same transport path and retry policy as [`execute`](WorkerClient::execute).
    #[instrument(skip(self))]
    pub async fn send(&mut self, cmd: &Command) -> crate::Result<()> {
        self.call(&cmd.to_frame()).await.map(drop)
    }

    /// Start a pipeline on this worker's connection.
    ///
    /// Performs the once-per-pipeline health check: a handle that saw the
    /// peer close gets one timeout-bounded reconnect (stale handle kept,
    /// best effort, if that fails); an absent handle gets a *plain* connect
    /// that, unlike `execute`'s, is not bounded by the configured timeout.
    /// The asymmetry is intentional; only the reconnect path is bounded.
    ///
    /// The returned [`Pipeline`] borrows this client mutably, so `execute`
    /// cannot be interleaved while replies are outstanding.
    #[instrument(skip(self))]
    pub async fn begin_pipeline(&mut self) -> crate::Result<Pipeline<'_>> {
        let cfg = self.registry.current();

        if matches!(&self.slot, Some(handle) if handle.saw_eof) {
            match open(&cfg, Some(cfg.timeout())).await {
                Ok(conn) => self.slot = Some(Handle::new(conn)),
                Err(err) => error!(%err, "redis reconnect failed"),
            }
        }

        let handle = match self.slot {
            Some(ref mut handle) => handle,
            None => {
                let conn = open(&cfg, None)
                    .await
                    .inspect_err(|err| error!(%err, "redis connect failed"))?;
                self.slot.insert(Handle::new(conn))
            }
        };

        Ok(Pipeline { handle, cfg })
    }

    /// Send one command frame and await its reply, reconnecting and retrying
    /// exactly once if the peer closed the stream.
    async fn call(&mut self, frame: &Frame) -> crate::Result<Frame> {
        let cfg = self.registry.current();

        let result = match self.round_trip(&cfg, frame).await {
            Err(Error::ConnectionClosed) => {
                warn!("connection closed by peer; reconnecting once");
                match self.reopen(&cfg).await {
                    Ok(()) => self.round_trip(&cfg, frame).await,
                    Err(err) => Err(err),
                }
            }
            result => result,
        };

        if let Err(err) = &result {
            error!(%err, "redis command failed");
        }

        result
    }

    /// One send + receive on this worker's handle, opening it first if the
    /// slot is empty. Send and receive are both bounded by the configured
    /// timeout.
    async fn round_trip(&mut self, cfg: &Config, frame: &Frame) -> crate::Result<Frame> {
        let bound = cfg.timeout();

        let handle = match self.slot {
            Some(ref mut handle) => handle,
            None => {
                let conn = open(cfg, Some(bound))
                    .await
                    .inspect_err(|err| error!(%err, "redis connect failed"))?;
                self.slot.insert(Handle::new(conn))
            }
        };

        debug!(request = ?frame);
        match timeout(bound, handle.conn.write_frame(frame)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout {
                    op: "send",
                    timeout: bound,
                })
            }
        }

        let reply = match timeout(bound, handle.conn.read_frame()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(Error::Timeout {
                    op: "receive",
                    timeout: bound,
                })
            }
        };

        match reply {
            Ok(Some(reply)) => {
                debug!(response = ?reply);
                Ok(reply)
            }
            Ok(None) => {
                handle.saw_eof = true;
                Err(Error::ConnectionClosed)
            }
            Err(err) => {
                if matches!(err, Error::ConnectionClosed) {
                    handle.saw_eof = true;
                }
                Err(err)
            }
        }
    }

    /// Replace the handle with a freshly opened connection.
    ///
    /// On failure the dead handle is retained, marked `saw_eof`; no usable
    /// connection is left behind for this attempt and the caller sees the
    /// connect error.
    async fn reopen(&mut self, cfg: &Config) -> crate::Result<()> {
        match open(cfg, Some(cfg.timeout())).await {
            Ok(conn) => {
                // Dropping the old handle closes its socket.
                self.slot = Some(Handle::new(conn));
                Ok(())
            }
            Err(err) => {
                error!(%err, "redis reconnect failed");
                if let Some(handle) = &mut self.slot {
                    handle.saw_eof = true;
                }
                Err(err)
            }
        }
    }
}

/// Batched command submission on one worker's connection.
///
/// Replies arrive in submission order; the caller must call
/// [`consume`](Pipeline::consume) exactly as many times as it called
/// [`submit`](Pipeline::submit). The pipeline itself never reconnects — a
/// failure is reported and the caller may start a new pipeline.
#[derive(Debug)]
pub struct Pipeline<'a> {
    handle: &'a mut Handle,
    cfg: Arc<Config>,
}

impl Pipeline<'_> {
    /// Write one command to the wire without waiting for its reply.
    #[instrument(skip(self))]
    pub async fn submit(&mut self, cmd: &Command) -> crate::Result<()> {
        let frame = cmd.to_frame();
        let bound = self.cfg.timeout();

        debug!(request = ?frame);
        match timeout(bound, self.handle.conn.write_frame(&frame)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout {
                op: "send",
                timeout: bound,
            }),
        }
    }

    /// Await the next reply, in FIFO order with prior submissions, and
    /// convert it exactly as [`WorkerClient::execute`] does.
    #[instrument(skip(self, ws))]
    pub async fn consume(&mut self, ws: &mut Workspace) -> crate::Result<Option<Bytes>> {
        let bound = self.cfg.timeout();

        let reply = match timeout(bound, self.handle.conn.read_frame()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(Error::Timeout {
                    op: "receive",
                    timeout: bound,
                })
            }
        };

        match reply {
            Ok(Some(reply)) => {
                debug!(response = ?reply);
                Ok(render(ws, reply))
            }
            Ok(None) => {
                self.handle.saw_eof = true;
                error!("connection closed while draining pipeline");
                Err(Error::ConnectionClosed)
            }
            Err(err) => {
                if matches!(err, Error::ConnectionClosed) {
                    self.handle.saw_eof = true;
                }
                error!(%err, "redis pipeline drain failed");
                Err(err)
            }
        }
    }
}

/// Convert one reply frame into the caller's text representation,
/// materialized in the request workspace.
fn render(ws: &mut Workspace, reply: Frame) -> Option<Bytes> {
    match reply {
        Frame::Simple(value) => Some(ws.dup(value.as_bytes())),
        Frame::Error(value) => Some(ws.dup(value.as_bytes())),
        Frame::Integer(value) => Some(ws.put_decimal(value)),
        Frame::Null => None,
        Frame::Bulk(value) => Some(ws.dup(&value)),
        // Element structure is not decoded; only the tag survives.
        Frame::Array(_) => Some(ws.dup(b"array")),
    }
}

/// Open a connection to the configured address, optionally bounded.
///
/// A connect that exceeds `bound` is reported as [`Error::Connect`] with a
/// timed-out source.
async fn open(cfg: &Config, bound: Option<Duration>) -> crate::Result<Connection> {
    let addr = cfg.addr();

    let stream = match bound {
        Some(dur) => match timeout(dur, TcpStream::connect(addr.as_str())).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
        },
        None => TcpStream::connect(addr.as_str()).await,
    };

    match stream {
        Ok(stream) => Ok(Connection::new(stream)),
        Err(source) => Err(Error::Connect { addr, source }),
    }
}
