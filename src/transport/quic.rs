//! SCION transport implementation
//!
//! Dials and listens on SCION endpoints through an encrypted QUIC session
//! constrained to exactly one bidirectional stream, so a session can be
//! handed to the host as an ordinary byte-stream connection.
//!
//! Sessions are encrypted but unauthenticated: the client skips certificate
//! verification and the listener presents a throwaway self-signed identity.
//! This matches the trust model of plain TCP peer links, not a PKI.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use quinn::crypto::rustls::{QuicClientConfig, QuicServerConfig};
use quinn::{ClientConfig, Endpoint, RecvStream, SendStream, ServerConfig, TransportConfig as QuinnTransportConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::common::{IntoStream, PathAddr, Result, Stream};
use crate::config::TransportConfig;
use crate::error::Error;
use crate::resolver::{LocalResolver, Resolver};

use super::{Listener, Transport};

/// ALPN tag restricting a session to a single logical stream
pub const SINGLE_STREAM_PROTO: &[u8] = b"qs";

/// Application error code used when tearing down a session whose single
/// stream never came up
const SINGLE_STREAM_ERROR_CODE: u32 = 0x1;

/// SNI placeholder; peers do not verify certificates, but the TLS stack
/// still wants a server name
const SNI_NAME: &str = "scion";

/// SCION transport - dials and listens via single-stream QUIC sessions
pub struct ScionTransport {
    config: TransportConfig,
    resolver: Arc<dyn Resolver>,
}

impl ScionTransport {
    pub fn new(config: TransportConfig, resolver: Arc<dyn Resolver>) -> Self {
        Self { config, resolver }
    }

    /// Dial a SCION endpoint and return a byte-stream connection.
    ///
    /// The deadline is `now + timeout`; cancelling `cancel` aborts an
    /// in-flight resolution or dial. An already-cancelled token returns
    /// without attempting resolution.
    pub async fn dial(
        &self,
        cancel: &CancellationToken,
        address: &str,
        timeout: Duration,
    ) -> Result<SingleStream> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout(timeout, self.dial_inner(address)) => {
                res.map_err(|_| Error::Timeout)?
            }
        }
    }

    async fn dial_inner(&self, address: &str) -> Result<SingleStream> {
        let remote = self.resolver.resolve(address).await?;
        let underlay = remote.underlay();

        let bind = if underlay.is_ipv6() {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
        } else {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
        };
        let mut endpoint =
            Endpoint::client(bind).map_err(|e| Error::Dial(format!("local endpoint: {}", e)))?;
        endpoint.set_default_client_config(self.client_config()?);

        let session = endpoint
            .connect(underlay, SNI_NAME)
            .map_err(|e| Error::Dial(e.to_string()))?
            .await
            .map_err(|e| Error::Dial(e.to_string()))?;
        debug!("Dialed {} via {}", remote, underlay);

        match session.open_bi().await {
            Ok((send, recv)) => Ok(SingleStream::new(endpoint, session, send, recv)),
            Err(e) => {
                // Never leak a session whose single stream never came up
                session.close(SINGLE_STREAM_ERROR_CODE.into(), b"single stream init failed");
                Err(Error::Stream(e.to_string()))
            }
        }
    }

    /// Listen on a SCION endpoint.
    ///
    /// Generates a fresh ephemeral TLS identity for the listener lifetime
    /// and binds a QUIC endpoint advertising the single-stream protocol.
    pub async fn listen(
        &self,
        cancel: &CancellationToken,
        address: &str,
    ) -> Result<ScionListener> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let requested = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            res = self.resolver.resolve(address) => res?,
        };

        let identity = EphemeralIdentity::generate()?;
        let server_config = self.server_config(&identity)?;
        let endpoint = Endpoint::server(server_config, requested.underlay())
            .map_err(|e| Error::Bind(e.to_string()))?;
        let bound = endpoint
            .local_addr()
            .map_err(|e| Error::Bind(e.to_string()))?;
        let local = PathAddr::new(requested.isd_as(), bound.ip(), bound.port());
        info!("Listening on {}", local);

        Ok(ScionListener {
            endpoint,
            local,
            _identity: identity,
        })
    }

    fn client_config(&self) -> Result<ClientConfig> {
        let mut crypto = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
            .with_no_client_auth();
        crypto.alpn_protocols = vec![SINGLE_STREAM_PROTO.to_vec()];

        let quic_crypto = QuicClientConfig::try_from(crypto)
            .map_err(|e| Error::Config(format!("Client crypto config error: {}", e)))?;
        let mut client = ClientConfig::new(Arc::new(quic_crypto));
        client.transport_config(self.quinn_transport_config());
        Ok(client)
    }

    fn server_config(&self, identity: &EphemeralIdentity) -> Result<ServerConfig> {
        let mut crypto = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(identity.cert_chain(), identity.private_key())
            .map_err(|e| Error::Config(format!("Server crypto config error: {}", e)))?;
        crypto.alpn_protocols = vec![SINGLE_STREAM_PROTO.to_vec()];

        let quic_crypto = QuicServerConfig::try_from(crypto)
            .map_err(|e| Error::Config(format!("Server crypto config error: {}", e)))?;
        let mut server = ServerConfig::with_crypto(Arc::new(quic_crypto));
        server.transport_config(self.quinn_transport_config());
        Ok(server)
    }

    fn quinn_transport_config(&self) -> Arc<QuinnTransportConfig> {
        let mut transport = QuinnTransportConfig::default();
        transport.max_idle_timeout(self.config.idle_timeout().try_into().ok());
        transport.keep_alive_interval(Some(self.config.keep_alive()));
        Arc::new(transport)
    }
}

impl Default for ScionTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default(), Arc::new(LocalResolver))
    }
}

#[async_trait]
impl Transport for ScionTransport {
    async fn connect(&self, addr: &str) -> Result<Stream> {
        let cancel = CancellationToken::new();
        let stream = self
            .dial(&cancel, addr, self.config.handshake_timeout())
            .await?;
        Ok(stream.into_stream())
    }

    async fn bind(&self, addr: &str) -> Result<Box<dyn Listener>> {
        let cancel = CancellationToken::new();
        let listener = self.listen(&cancel, addr).await?;
        Ok(Box::new(listener))
    }
}

/// Listener side of the SCION transport
pub struct ScionListener {
    endpoint: Endpoint,
    local: PathAddr,
    // Held for the listener lifetime, then discarded with it
    _identity: EphemeralIdentity,
}

impl ScionListener {
    /// Accept the next inbound session and its single stream.
    ///
    /// Suspends until a peer completes the session handshake and opens its
    /// one stream. Extra streams a misbehaving peer might open afterwards
    /// are not policed here.
    pub async fn accept(&self) -> Result<SingleStream> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| Error::Accept("listener closed".to_string()))?;
        let session = incoming.await.map_err(|e| Error::Accept(e.to_string()))?;

        match session.accept_bi().await {
            Ok((send, recv)) => {
                debug!("Accepted single-stream session from {}", session.remote_address());
                Ok(SingleStream::new(self.endpoint.clone(), session, send, recv))
            }
            Err(e) => {
                session.close(SINGLE_STREAM_ERROR_CODE.into(), b"single stream init failed");
                Err(Error::Accept(e.to_string()))
            }
        }
    }

    /// The bound address, with the actually-assigned port for port-0 binds
    pub fn local_addr(&self) -> PathAddr {
        self.local
    }

    /// Release the bind endpoint; blocked accepts return an error
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"listener closed");
    }
}

#[async_trait]
impl Listener for ScionListener {
    async fn accept(&self) -> Result<(Stream, SocketAddr)> {
        let conn = ScionListener::accept(self).await?;
        let remote = conn.remote_address();
        Ok((conn.into_stream(), remote))
    }

    fn local_addr(&self) -> Result<PathAddr> {
        Ok(self.local)
    }

    async fn close(&self) -> Result<()> {
        ScionListener::close(self);
        Ok(())
    }
}

/// A QUIC session restricted to one bidirectional stream.
///
/// Owns the session exclusively; closing or dropping the connection closes
/// the session. This crate never opens a second stream on it.
#[derive(Debug)]
pub struct SingleStream {
    session: quinn::Connection,
    send: SendStream,
    recv: RecvStream,
    // Keeps the UDP endpoint driving this session alive
    _endpoint: Endpoint,
}

impl SingleStream {
    fn new(endpoint: Endpoint, session: quinn::Connection, send: SendStream, recv: RecvStream) -> Self {
        Self {
            session,
            send,
            recv,
            _endpoint: endpoint,
        }
    }

    /// The peer's underlay address
    pub fn remote_address(&self) -> SocketAddr {
        self.session.remote_address()
    }

    /// Close the whole session; in-flight reads and writes fail with a
    /// closed-connection error
    pub fn close(&self) {
        self.session.close(0u32.into(), b"");
    }
}

impl AsyncRead for SingleStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.recv).poll_read(cx, buf)
    }
}

impl AsyncWrite for SingleStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        AsyncWrite::poll_write(Pin::new(&mut self.send), cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.send).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.send).poll_shutdown(cx)
    }
}

/// Self-signed TLS identity generated fresh for each listener.
///
/// Exists only to satisfy the handshake; peers do not validate it and it is
/// never persisted.
struct EphemeralIdentity {
    cert: CertificateDer<'static>,
    key: PrivateKeyDer<'static>,
}

impl EphemeralIdentity {
    fn generate() -> Result<Self> {
        let cert = rcgen::generate_simple_self_signed(vec![SNI_NAME.to_string()])
            .map_err(|e| Error::Bind(format!("identity generation: {}", e)))?;
        let key = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());
        Ok(Self {
            cert: CertificateDer::from(cert.cert),
            key: key.into(),
        })
    }

    fn cert_chain(&self) -> Vec<CertificateDer<'static>> {
        vec![self.cert.clone()]
    }

    fn private_key(&self) -> PrivateKeyDer<'static> {
        self.key.clone_key()
    }
}

/// Certificate verifier that accepts any peer.
///
/// Peer authentication is intentionally disabled; sessions stay encrypted
/// but follow the unauthenticated trust model of plain TCP peer links.
#[derive(Debug)]
struct InsecureVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Resolver that counts how often it is consulted
    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Resolver for CountingResolver {
        async fn resolve(&self, address: &str) -> Result<PathAddr> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            address.parse()
        }
    }

    #[tokio::test]
    async fn test_listen_dial_echo() {
        let transport = ScionTransport::default();
        let cancel = CancellationToken::new();

        let listener = transport
            .listen(&cancel, "1-ff00:0:110,[127.0.0.1]:0")
            .await
            .unwrap();
        let address = listener.local_addr().to_string();

        let server = tokio::spawn(async move {
            let mut conn = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            conn.read_exact(&mut buf).await.unwrap();
            conn.write_all(&buf).await.unwrap();
            conn.flush().await.unwrap();
            buf
        });

        let mut conn = transport
            .dial(&cancel, &address, Duration::from_secs(5))
            .await
            .unwrap();
        conn.write_all(b"hello").await.unwrap();
        conn.flush().await.unwrap();

        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(&server.await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_dial_cancelled_before_resolution() {
        let resolver = Arc::new(CountingResolver::default());
        let transport = ScionTransport::new(TransportConfig::default(), resolver.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = transport
            .dial(&cancel, "1-ff00:0:110,[127.0.0.1]:1", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dial_cancelled_in_flight() {
        let transport = ScionTransport::default();

        // A bound socket that never answers keeps the handshake in flight
        let blackhole = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = format!("1-ff00:0:110,[127.0.0.1]:{}", blackhole.local_addr().unwrap().port());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = transport
            .dial(&cancel, &address, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_dial_timeout() {
        let transport = ScionTransport::default();
        let blackhole = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = format!("1-ff00:0:110,[127.0.0.1]:{}", blackhole.local_addr().unwrap().port());

        let cancel = CancellationToken::new();
        let err = transport
            .dial(&cancel, &address, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[tokio::test]
    async fn test_dial_rejects_malformed_address() {
        let transport = ScionTransport::default();
        let cancel = CancellationToken::new();
        let err = transport
            .dial(&cancel, "127.0.0.1:8333", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_accept_after_close() {
        let transport = ScionTransport::default();
        let cancel = CancellationToken::new();

        let listener = transport
            .listen(&cancel, "1-ff00:0:110,[127.0.0.1]:0")
            .await
            .unwrap();
        listener.close();

        let err = listener.accept().await.unwrap_err();
        assert!(matches!(err, Error::Accept(_)));
    }

    #[tokio::test]
    async fn test_close_unblocks_accept() {
        let transport = ScionTransport::default();
        let cancel = CancellationToken::new();

        let listener = Arc::new(
            transport
                .listen(&cancel, "1-ff00:0:110,[127.0.0.1]:0")
                .await
                .unwrap(),
        );

        let blocked = {
            let listener = listener.clone();
            tokio::spawn(async move { listener.accept().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        listener.close();

        let err = blocked.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Accept(_)));
    }

    #[tokio::test]
    async fn test_listener_reports_bound_port() {
        let transport = ScionTransport::default();
        let cancel = CancellationToken::new();

        let listener = transport
            .listen(&cancel, "1-ff00:0:110,[127.0.0.1]:0")
            .await
            .unwrap();
        let local = listener.local_addr();
        assert_ne!(local.port(), 0);
        assert_eq!(local.isd_as(), "1-ff00:0:110".parse().unwrap());
    }

    #[tokio::test]
    async fn test_transport_trait_echo() {
        let transport = ScionTransport::default();

        let listener = transport.bind("1-ff00:0:110,[127.0.0.1]:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut stream, _peer) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(&buf).await.unwrap();
            stream.flush().await.unwrap();
        });

        let mut stream = transport.connect(&address).await.unwrap();
        stream.write_all(b"ping").await.unwrap();
        stream.flush().await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        server.await.unwrap();
    }

    #[test]
    fn test_ephemeral_identity_generation() {
        let identity = EphemeralIdentity::generate().unwrap();
        assert!(!identity.cert_chain().is_empty());
        // Each listener gets its own identity
        let other = EphemeralIdentity::generate().unwrap();
        assert_ne!(identity.cert.as_ref(), other.cert.as_ref());
    }
}
