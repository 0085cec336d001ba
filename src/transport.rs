//! Transport
//!
//! Byte-frame delivery between two endpoints. The protocol layers only see
//! `send(bytes)` / `recv() -> bytes`.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │  Payload (envelope bytes)   │
//! └──────────┴─────────────────────────────┘
//! ```
//! Length is big-endian. The payload is a plaintext envelope during the
//! handshake and AES ciphertext afterwards.

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{AgoraError, Result};

/// Header size: 4 bytes length
pub const HEADER_SIZE: usize = 4;

/// Delivers whole frames to the peer
pub trait Transport {
    /// Send one frame
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Receive the next frame
    ///
    /// Returns `ConnectionClosed` once the peer is gone.
    fn recv(&mut self) -> Result<Vec<u8>>;
}

// =============================================================================
// Framing helpers
// =============================================================================

/// Write a length-prefixed frame
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8], max_frame_size: usize) -> Result<()> {
    if payload.len() > max_frame_size || payload.len() > u32::MAX as usize {
        return Err(AgoraError::FrameTooLarge {
            len: payload.len(),
            max: max_frame_size,
        });
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);

    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-prefixed frame
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_frame<R: Read>(reader: &mut R, max_frame_size: usize) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes(header) as usize;
    if payload_len > max_frame_size {
        return Err(AgoraError::FrameTooLarge {
            len: payload_len,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }
    Ok(payload)
}

/// Map I/O errors meaning "peer went away" onto the protocol's terminal states
fn classify_io(error: AgoraError) -> AgoraError {
    match error {
        AgoraError::Io(ref e) => match e.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => AgoraError::ConnectionClosed,
            // Windows reports TimedOut where unix reports WouldBlock
            ErrorKind::WouldBlock | ErrorKind::TimedOut => AgoraError::Timeout,
            _ => error,
        },
        other => other,
    }
}

// =============================================================================
// TCP
// =============================================================================

/// Framed transport over a TCP stream
pub struct TcpTransport {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    max_frame_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl TcpTransport {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream, max_frame_size: usize) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            max_frame_size,
            peer_addr,
        })
    }

    /// Configure timeouts (0 = blocking forever)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read = (read_ms > 0).then(|| Duration::from_millis(read_ms));
        let write = (write_ms > 0).then(|| Duration::from_millis(write_ms));
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.get_ref().set_write_timeout(write)?;
        Ok(())
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Close both directions
    pub fn shutdown(&mut self) {
        let _ = self.writer.flush();
        let _ = self.writer.get_ref().shutdown(std::net::Shutdown::Both);
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        write_frame(&mut self.writer, frame, self.max_frame_size).map_err(classify_io)
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        read_frame(&mut self.reader, self.max_frame_size).map_err(classify_io)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// One end of an in-memory frame pipe
///
/// Dropping either end closes the pipe for the other.
pub struct MemoryTransport {
    outgoing: Sender<Vec<u8>>,
    incoming: Receiver<Vec<u8>>,
    timeout: Option<Duration>,
}

impl MemoryTransport {
    /// Two connected ends
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = channel::unbounded();
        let (b_tx, b_rx) = channel::unbounded();
        (
            MemoryTransport {
                outgoing: a_tx,
                incoming: b_rx,
                timeout: None,
            },
            MemoryTransport {
                outgoing: b_tx,
                incoming: a_rx,
                timeout: None,
            },
        )
    }

    /// Bound how long `recv` waits
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.outgoing
            .send(frame.to_vec())
            .map_err(|_| AgoraError::ConnectionClosed)
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        match self.timeout {
            Some(timeout) => self.incoming.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => AgoraError::Timeout,
                RecvTimeoutError::Disconnected => AgoraError::ConnectionClosed,
            }),
            None => self
                .incoming
                .recv()
                .map_err(|_| AgoraError::ConnectionClosed),
        }
    }
}
