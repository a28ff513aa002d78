//! scionet - SCION networking for peer-to-peer nodes
//!
//! Lets a node dial and listen on the SCION path-aware network while
//! presenting the same byte-stream connection/listener abstraction it
//! already uses for classic TCP peer links.
//!
//! # Architecture
//!
//! ```text
//! Address syntax ("1-ff00:0:110,[127.0.0.1]:30041")
//! → Resolver (path-aware endpoint lookup, pluggable)
//! → QUIC session, encrypted, restricted to one logical stream
//! → Stream (the host's classic byte-stream abstraction)
//! ```
//!
//! ## Core Principles
//!
//! - Sessions are encrypted but unauthenticated, like plain TCP peer links
//! - Exactly one logical stream per session, so a session IS a connection
//! - Path selection and QUIC internals stay behind collaborator seams
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── common/          # Core types: Stream, PathAddr, address helpers
//! ├── transport/       # Dial/listen over single-stream QUIC, registry
//! ├── resolver.rs      # Address resolution seam
//! ├── bridge.rs        # Legacy IP/port projection
//! └── config.rs        # Transport tuning
//! ```

// Core types
pub mod common;
pub mod error;

// Transport stack
pub mod resolver;
pub mod transport;

// Supporting modules
pub mod bridge;
pub mod config;

// Re-exports for convenience
pub use bridge::extract_ip_port;
pub use common::{is_path_address, join_host_port, split_host_port, IsdAsn, PathAddr, Stream};
pub use config::TransportConfig;
pub use error::{Error, Result};
pub use resolver::{LocalResolver, Resolver};
pub use transport::{
    Listener, ScionListener, ScionTransport, SingleStream, Transport, TransportRegistry, NETWORK,
};
