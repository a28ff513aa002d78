//! Transport Layer
//!
//! Responsibilities:
//! - Establish peer connections over the path-aware network
//! - Present them as the same Stream/Listener abstraction classic TCP uses
//!
//! Protocol parsing and routing decisions live elsewhere; this layer ONLY
//! deals with connection establishment and raw byte transport.

mod quic;

pub use quic::{ScionListener, ScionTransport, SingleStream, SINGLE_STREAM_PROTO};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::common::{PathAddr, Result, Stream};

/// Network scheme name under which the SCION transport registers.
///
/// Hosts select this module by looking the name up in a [`TransportRegistry`]
/// rather than switching on ambient globals.
pub const NETWORK: &str = "scion";

/// Transport trait for establishing connections
///
/// Addresses cross this boundary as strings, in whatever syntax the
/// transport's network uses on the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to a remote address
    async fn connect(&self, addr: &str) -> Result<Stream>;

    /// Create a listener bound to an address
    async fn bind(&self, addr: &str) -> Result<Box<dyn Listener>>;
}

/// Listener trait for accepting incoming connections
#[async_trait]
pub trait Listener: Send + Sync {
    /// Accept a new connection, returning it with the peer's underlay address
    async fn accept(&self) -> Result<(Stream, SocketAddr)>;

    /// Get the local bound address
    fn local_addr(&self) -> Result<PathAddr>;

    /// Close the listener
    async fn close(&self) -> Result<()>;
}

/// Registry of transports by network scheme name
pub struct TransportRegistry {
    transports: RwLock<HashMap<String, Arc<dyn Transport>>>,
}

impl TransportRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the SCION transport registered under [`NETWORK`]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(NETWORK, Arc::new(ScionTransport::default()));
        registry
    }

    /// Register a transport under a scheme name, replacing any previous entry
    pub fn register(&self, scheme: impl Into<String>, transport: Arc<dyn Transport>) {
        self.transports.write().insert(scheme.into(), transport);
    }

    /// Look up the transport for a scheme name
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn Transport>> {
        self.transports.read().get(scheme).cloned()
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
