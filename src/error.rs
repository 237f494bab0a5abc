use std::io;
use std::time::Duration;

/// Failures surfaced by the client.
///
/// The classification matters: [`Error::ConnectionClosed`] is the one kind
/// that triggers the reconnect-and-retry path in
/// [`WorkerClient::execute`](crate::WorkerClient::execute). Everything else
/// is reported to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport could not be established. A connect that exceeds the
    /// configured timeout lands here with an [`io::ErrorKind::TimedOut`]
    /// source.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The reply violated the protocol framing.
    #[error("protocol error; {0}")]
    Protocol(String),

    /// Send or receive exceeded the configured bound.
    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    /// Any other transport I/O failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
