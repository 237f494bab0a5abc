//! Scripted in-process RESP server backing the integration tests.
//!
//! Each scripted connection is a list of [`Step`]s; every step first reads
//! one multi-bulk command off the wire, then acts. Closing without a reply
//! is how the tests simulate a peer killing the connection out-of-band.

#![allow(dead_code)]

use redis_worker::{Config, Registry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

pub enum Step {
    /// Read one command, then write these raw reply bytes.
    Reply(Vec<u8>),
    /// Read one command, then close the connection without replying.
    CloseAfterRead,
    /// Read one command and never reply.
    Stall,
}

pub fn reply(bytes: &[u8]) -> Step {
    Step::Reply(bytes.to_vec())
}

/// Serve the scripted connections in order on an ephemeral port.
pub async fn spawn_server(connections: Vec<Vec<Step>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        for script in connections {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            drive(stream, script).await;
        }
    });

    addr
}

/// Accepts any number of connections; each answers `+PONG` to every command
/// until its client hangs up.
pub async fn spawn_pong_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);
                while read_command(&mut reader).await.is_some() {
                    if write_half.write_all(b"+PONG\r\n").await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

/// A registry pointed at the given server, with a test-friendly 1 s timeout.
pub fn registry_for(addr: SocketAddr) -> Arc<Registry> {
    registry_with_timeout(addr, 1_000)
}

pub fn registry_with_timeout(addr: SocketAddr, timeout_ms: i64) -> Arc<Registry> {
    Arc::new(Registry::new(Config::new(
        addr.ip(),
        i32::from(addr.port()),
        timeout_ms,
    )))
}

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn drive(stream: TcpStream, script: Vec<Step>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    for step in script {
        if read_command(&mut reader).await.is_none() {
            return;
        }

        match step {
            Step::Reply(bytes) => {
                if write_half.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Step::CloseAfterRead => return,
            Step::Stall => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
        }
    }
}

/// Read one multi-bulk command; `None` once the client hangs up.
async fn read_command(reader: &mut BufReader<OwnedReadHalf>) -> Option<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    read_line(reader, &mut line).await?;
    assert!(
        line.starts_with(b"*"),
        "expected array header, got {line:?}"
    );
    let count: usize = std::str::from_utf8(&line[1..]).ok()?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line).await?;
        assert!(line.starts_with(b"$"), "expected bulk header, got {line:?}");
        let len: usize = std::str::from_utf8(&line[1..]).ok()?.parse().ok()?;

        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).await.ok()?;
        data.truncate(len);
        args.push(data);
    }

    Some(args)
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>, buf: &mut Vec<u8>) -> Option<()> {
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            while matches!(buf.last(), Some(b'\r' | b'\n')) {
                buf.pop();
            }
            Some(())
        }
    }
}
