//! Common types and abstractions
//!
//! This module defines the core types used throughout the crate:
//! - Stream: unified async I/O abstraction
//! - PathAddr / IsdAsn: SCION address representation
//! - split/join/detect helpers for SCION and classic host:port syntax

mod address;
mod stream;

pub use address::{is_path_address, join_host_port, split_host_port, IsdAsn, PathAddr};
pub use stream::{AsyncReadWrite, IntoStream, Stream};

// Re-export error types from crate root
pub use crate::error::{Error, Result};
