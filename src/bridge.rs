//! Legacy address bridge
//!
//! Some host code keeps addresses in classic IP/port structures and cannot
//! carry a routing scope. This module projects a SCION address down to that
//! shape.

use std::net::IpAddr;

use crate::common::PathAddr;
use crate::error::Result;

/// Extract the IP and port of a SCION address.
///
/// This is a lossy legacy-compatibility projection: the ISD-AS routing scope
/// is discarded, so the result identifies the host only within its AS. Fails
/// with a parse error for anything that is not a SCION address, including
/// plain `ip:port` strings.
pub fn extract_ip_port(address: &str) -> Result<(IpAddr, u16)> {
    let addr: PathAddr = address.parse()?;
    Ok((addr.host(), addr.port()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::net::Ipv4Addr;

    #[test]
    fn test_extract_ip_port() {
        let (ip, port) = extract_ip_port("1-ff00:0:110,[127.0.0.1]:30041").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(port, 30041);

        let (ip, port) = extract_ip_port("1-ff00:0:110,[::1]:30041").unwrap();
        assert_eq!(ip, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(port, 30041);
    }

    #[test]
    fn test_extract_ip_port_requires_scope() {
        for bad in ["1.2.3.4:80", "[::1]:80", "example.com:80", ""] {
            let err = extract_ip_port(bad).unwrap_err();
            assert!(matches!(err, Error::Parse(_)), "accepted {:?}", bad);
        }
    }
}
