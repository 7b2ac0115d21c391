//! # TCP Transport
//!
//! Loopback TCP with length-prefixed frames.
//!
//! ```text
//! [u32 BE: len][frame bytes of len]
//! ```

use std::net::Ipv4Addr;
use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpSocket;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

use crate::transport::Error;
use crate::transport::Result;
use crate::transport::Transport;

/// Size of the length prefix in front of every frame.
const PREFIX_SIZE: usize = 4;

/// Address of `port` on the IPv4 loopback interface.
pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// A connected stream to exactly one peer.
///
/// Reads and writes are independently locked, so one task may block in `recv`
/// while another sends.
pub struct TcpTransport {
    peer: SocketAddr,
    max_frame: usize,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpTransport {
    fn from_stream(stream: TcpStream, peer: SocketAddr) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle on stream to {}: {}", peer, e);
        }
        let (reader, writer) = stream.into_split();
        Self {
            peer,
            max_frame: duopack::MSG_MAX_SIZE,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Overrides the largest frame this transport sends or accepts.
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Reads and discards `len` bytes so the stream stays aligned on frame boundaries.
    async fn discard(reader: &mut OwnedReadHalf, len: usize) -> Result<()> {
        let mut limited = reader.take(len as u64);
        let drained = tokio::io::copy(&mut limited, &mut tokio::io::sink()).await?;
        if drained < len as u64 {
            return Err(Error::ConnectionLost("stream ended inside an oversized frame".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_frame {
            return Err(Error::FrameTooLarge { size: payload.len(), max: self.max_frame });
        }

        let mut buf = Vec::with_capacity(PREFIX_SIZE + payload.len());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);

        // write_all loops over partial writes
        let mut writer = self.writer.lock().await;
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        let mut reader = self.reader.lock().await;

        // only EOF on a frame boundary is a clean close
        let mut len_buf = [0u8; PREFIX_SIZE];
        let mut filled = 0;
        while filled < PREFIX_SIZE {
            let n = reader.read(&mut len_buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    debug!("Peer {} closed the connection", self.peer);
                    return Err(Error::ConnectionClosed);
                }
                return Err(Error::ConnectionLost(format!(
                    "peer closed after {} of {} length bytes",
                    filled, PREFIX_SIZE
                )));
            }
            filled += n;
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > self.max_frame {
            warn!("Discarding {} byte frame from {} (limit {})", len, self.peer, self.max_frame);
            Self::discard(&mut reader, len).await?;
            return Err(Error::FrameTooLarge { size: len, max: self.max_frame });
        }

        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame).await?;
        Ok(frame)
    }

    async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// A bound loopback listener that hands out a single peer.
pub struct Listener {
    inner: TcpListener,
    addr: SocketAddr,
}

impl Listener {
    /// Binds `addr` with a backlog of one.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let bind_err = |e: std::io::Error| Error::Bind { addr: addr.to_string(), reason: e.to_string() };

        let socket = if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }
            .map_err(bind_err)?;
        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let inner = socket.listen(1).map_err(bind_err)?;
        let addr = inner.local_addr().map_err(bind_err)?;

        debug!("Listening for a single peer on {}", addr);
        Ok(Self { inner, addr })
    }

    /// The bound address, with the OS-assigned port if `0` was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts exactly one peer, then stops listening.
    pub async fn accept_one(self) -> Result<TcpTransport> {
        let (stream, peer) = self.inner.accept().await.map_err(|e| Error::Accept(e.to_string()))?;
        debug!("Accepted peer {} on {}", peer, self.addr);
        // dropping self.inner closes the listening socket
        Ok(TcpTransport::from_stream(stream, peer))
    }
}

/// Binds the loopback `port`, accepts one peer, and stops listening.
pub async fn listen_and_accept(port: u16) -> Result<TcpTransport> {
    Listener::bind(loopback(port)).await?.accept_one().await
}

/// Connects to a listener at `addr`. A single attempt; failure is not retried.
pub async fn connect(addr: SocketAddr) -> Result<TcpTransport> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| Error::Connect { addr: addr.to_string(), reason: e.to_string() })?;
    debug!("Connected to {}", addr);
    Ok(TcpTransport::from_stream(stream, addr))
}
