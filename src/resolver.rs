//! Address resolution
//!
//! Resolving an address string to a routable endpoint is delegated behind
//! the [`Resolver`] trait: a full deployment plugs in a resolver backed by
//! the local path daemon, while [`LocalResolver`] handles literal addresses
//! for direct-neighbor and test setups.

use async_trait::async_trait;

use crate::common::{PathAddr, Result};

/// Resolves an address string to a routable SCION endpoint.
///
/// Implementations may perform network lookups; errors distinguish a
/// malformed string (`Error::Parse`) from a well-formed but unroutable one
/// (`Error::Resolve`).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve an address string
    async fn resolve(&self, address: &str) -> Result<PathAddr>;
}

/// Resolver for literal SCION addresses.
///
/// Parses the address and takes its embedded IP/port as the routable
/// endpoint. No hostname lookup and no path lookup; both belong to the
/// path-layer daemon behind a custom [`Resolver`].
#[derive(Debug, Default, Clone)]
pub struct LocalResolver;

#[async_trait]
impl Resolver for LocalResolver {
    async fn resolve(&self, address: &str) -> Result<PathAddr> {
        address.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_local_resolver_literal() {
        let resolver = LocalResolver;
        let addr = resolver
            .resolve("1-ff00:0:110,[127.0.0.1]:30041")
            .await
            .unwrap();
        assert_eq!(addr.port(), 30041);
        assert_eq!(addr.underlay(), "127.0.0.1:30041".parse().unwrap());
    }

    #[tokio::test]
    async fn test_local_resolver_rejects_classic() {
        let resolver = LocalResolver;
        let err = resolver.resolve("127.0.0.1:8333").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
