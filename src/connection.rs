use crate::frame::{self, Frame};
use crate::Error;
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// `Connection` reads and writes `Frame` values on the underlying
/// `TcpStream`.
///
/// `read_buf` is filled until it holds at least one full frame; the frame is
/// then decoded and handed to the caller, and any surplus bytes stay buffered
/// for the next read. Pipelined replies therefore drain in arrival order.
#[derive(Debug)]
pub struct Connection {
    stream: BufWriter<TcpStream>,
    // The buffer for reading frames.
    read_buf: BytesMut,
}

const BUF_SIZE: usize = 4 * 1024;

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(stream),
            read_buf: BytesMut::with_capacity(BUF_SIZE),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the peer closes the
    /// stream between frames, `None` is returned; a close that cuts a frame
    /// in half is reported as [`Error::ConnectionClosed`]. Either way the
    /// caller is looking at a dead transport.
    pub async fn read_frame(&mut self) -> crate::Result<Option<Frame>> {
        loop {
            // Attempt to parse a frame from the buffered data. If enough data
            // has been buffered, the frame is returned.
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // Not enough buffered data; read more from the socket.
            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.read_buf).await? {
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Tries to parse a frame from the buffer. Returns `Ok(None)` when the
    /// buffered bytes do not yet form a whole frame.
    fn parse_frame(&mut self) -> crate::Result<Option<Frame>> {
        use frame::Error::Incomplete;

        // Cursor implements `Buf` from the `bytes` crate
        let mut buf = Cursor::new(&self.read_buf[..]);

        // Checking first is much cheaper than a full parse and skips
        // allocating for frames that have not fully arrived yet.
        match Frame::check(&mut buf) {
            Ok(()) => {
                // `check` advanced the cursor to the end of the frame.
                let len = buf.position() as usize;

                // Reset the position before handing the cursor to `parse`.
                buf.set_position(0);
                let frame = Frame::parse(&mut buf).map_err(|e| Error::Protocol(e.to_string()))?;
                // Discard the parsed data from the read buffer.
                self.read_buf.advance(len);

                Ok(Some(frame))
            }
            Err(Incomplete) => Ok(None),
            Err(e) => Err(Error::Protocol(e.to_string())),
        }
    }

    /// Write a single `Frame` to the underlying stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        match frame {
            Frame::Array(val) => {
                // Encode the frame type prefix. For an array, it is `*`.
                self.stream.write_u8(b'*').await?;
                self.write_decimal(val.len() as i64).await?;

                for entry in val {
                    self.write_value(entry).await?;
                }
            }
            // The frame type is a literal. Encode the value directly.
            _ => self.write_value(frame).await?,
        }

        // flush the calls above.
        self.stream.flush().await
    }

    /// Write a frame literal to the stream.
    async fn write_value(&mut self, frame: &Frame) -> io::Result<()> {
        match frame {
            Frame::Simple(val) => {
                self.stream.write_u8(b'+').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Error(val) => {
                self.stream.write_u8(b'-').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Integer(val) => {
                self.stream.write_u8(b':').await?;
                self.write_decimal(*val).await?;
            }
            Frame::Null => {
                self.stream.write_all(b"$-1\r\n").await?;
            }
            Frame::Bulk(val) => {
                let len = val.len();

                self.stream.write_u8(b'$').await?;
                self.write_decimal(len as i64).await?;
                self.stream.write_all(val).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            // Commands are flat multi-bulk arrays; nested arrays never occur
            // on the write path.
            Frame::Array(_) => unreachable!(),
        }

        Ok(())
    }

    /// Write a decimal line to the stream.
    async fn write_decimal(&mut self, val: i64) -> io::Result<()> {
        use std::io::Write;

        // i64::MIN renders as 20 characters; 21 leaves headroom.
        let mut buf = [0u8; 21];
        let mut buf = Cursor::new(&mut buf[..]);
        write!(&mut buf, "{val}")?;

        let pos = buf.position() as usize;
        self.stream.write_all(&buf.get_ref()[..pos]).await?;
        self.stream.write_all(b"\r\n").await?;

        Ok(())
    }
}
