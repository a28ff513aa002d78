//! Stream abstraction
//!
//! Unified byte-stream type handed to the host application. Peer links are
//! consumed through this abstraction only, whether they run over TCP or a
//! path-aware session underneath.

use tokio::io::{AsyncRead, AsyncWrite};

/// The byte-stream type produced by transports.
pub type Stream = Box<dyn AsyncReadWrite + Unpin + Send>;

/// Combined trait for async read + write
pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}

impl<T: AsyncRead + AsyncWrite> AsyncReadWrite for T {}

/// Trait for types that can be converted into a Stream
pub trait IntoStream {
    fn into_stream(self) -> Stream;
}

impl<T> IntoStream for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn into_stream(self) -> Stream {
        Box::new(self)
    }
}
