//! [`Transport`]: an either-TCP-or-Unix-domain-socket byte stream.
//!
//! A future TLS wrapper slots in here without touching the codec or
//! receiver: both backends implement `AsyncRead`/`AsyncWrite`, which is all
//! [`Transport`]'s callers ever need.
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UnixStream};

const DEFAULT_UNIX_SOCKET_DIR: &str = "/var/run/postgresql";

/// A connected byte stream to a Postgres server: either TCP or a Unix-domain
/// socket.
pub enum Transport {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Transport {
    /// Connect over TCP, resolving `host` via standard address info.
    pub async fn connect_tcp(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self::Tcp(stream))
    }

    /// Connect over a Unix-domain socket at `<dir>/.s.PGSQL.<port>`.
    pub async fn connect_unix(dir: &str, port: u16) -> io::Result<Self> {
        let dir = dir.trim_end_matches('/');
        let dir = if dir.is_empty() { DEFAULT_UNIX_SOCKET_DIR } else { dir };
        let path = format!("{dir}/.s.PGSQL.{port}");
        Ok(Self::Unix(UnixStream::connect(path).await?))
    }

    /// Connect using the host-selection rule in §4.2: an empty host, or one
    /// beginning with `/`, selects the Unix-domain backend; anything else is
    /// TCP.
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        if host.is_empty() || host.starts_with('/') {
            Self::connect_unix(host, port).await
        } else {
            Self::connect_tcp(host, port).await
        }
    }

}

impl AsyncRead for Transport {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Self::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Self::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_flush(cx),
            Self::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Self::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp(_) => f.write_str("Transport::Tcp"),
            Self::Unix(_) => f.write_str("Transport::Unix"),
        }
    }
}
