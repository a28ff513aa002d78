//! SCION address parsing and host:port interop
//!
//! SCION addresses look like `"1-ff00:0:110,[127.0.0.1]:30041"`: an ISD-AS
//! routing scope, a comma, the host IP (bracketed for IPv6, optionally for
//! IPv4), and a port. The comma and the colons inside the AS number make
//! these strings unparseable by classic RFC-style host:port splitting, so
//! this module provides splitters and joiners that accept both syntaxes.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Largest AS number that is formatted as plain decimal (BGP-compatible
/// range). Larger AS numbers use the `x:y:z` hex-group form.
const MAX_BGP_ASN: u64 = u32::MAX as u64;

/// AS numbers are 48 bits wide.
const MAX_ASN: u64 = (1 << 48) - 1;

/// ISD-AS pair identifying the routing scope of a SCION address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsdAsn {
    isd: u16,
    asn: u64,
}

impl IsdAsn {
    /// Create a new ISD-AS pair
    pub fn new(isd: u16, asn: u64) -> Result<Self> {
        if asn > MAX_ASN {
            return Err(Error::Parse(format!("AS number out of range: {}", asn)));
        }
        Ok(Self { isd, asn })
    }

    /// The isolation domain identifier
    pub fn isd(&self) -> u16 {
        self.isd
    }

    /// The AS number (48 bits)
    pub fn asn(&self) -> u64 {
        self.asn
    }
}

impl FromStr for IsdAsn {
    type Err = Error;

    /// Parse `"<isd>-<asn>"`; the AS part is either decimal (BGP range) or
    /// three 16-bit hex groups separated by colons (`ff00:0:110`).
    fn from_str(s: &str) -> Result<Self> {
        let (isd_s, asn_s) = s
            .split_once('-')
            .ok_or_else(|| Error::Parse(format!("invalid ISD-AS: {}", s)))?;

        let isd: u16 = isd_s
            .parse()
            .map_err(|_| Error::Parse(format!("invalid ISD: {}", isd_s)))?;

        let asn = if asn_s.contains(':') {
            let groups: Vec<&str> = asn_s.split(':').collect();
            if groups.len() != 3 {
                return Err(Error::Parse(format!("invalid AS number: {}", asn_s)));
            }
            let mut asn: u64 = 0;
            for group in groups {
                let part = u16::from_str_radix(group, 16)
                    .map_err(|_| Error::Parse(format!("invalid AS number: {}", asn_s)))?;
                asn = (asn << 16) | u64::from(part);
            }
            asn
        } else {
            let asn: u64 = asn_s
                .parse()
                .map_err(|_| Error::Parse(format!("invalid AS number: {}", asn_s)))?;
            // Decimal form is only defined for the BGP-compatible range
            if asn > MAX_BGP_ASN {
                return Err(Error::Parse(format!("invalid AS number: {}", asn_s)));
            }
            asn
        };

        Ok(Self { isd, asn })
    }
}

impl fmt::Display for IsdAsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.asn <= MAX_BGP_ASN {
            write!(f, "{}-{}", self.isd, self.asn)
        } else {
            write!(
                f,
                "{}-{:x}:{:x}:{:x}",
                self.isd,
                self.asn >> 32,
                (self.asn >> 16) & 0xffff,
                self.asn & 0xffff
            )
        }
    }
}

/// A parsed SCION UDP address: routing scope plus host IP and port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathAddr {
    isd_as: IsdAsn,
    host: IpAddr,
    port: u16,
}

impl PathAddr {
    /// Create from parts
    pub fn new(isd_as: IsdAsn, host: IpAddr, port: u16) -> Self {
        Self { isd_as, host, port }
    }

    /// The ISD-AS routing scope
    pub fn isd_as(&self) -> IsdAsn {
        self.isd_as
    }

    /// The host IP
    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// The UDP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The IP/port pair as a plain socket address, without the scope
    pub fn underlay(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FromStr for PathAddr {
    type Err = Error;

    /// Parse `"<isd>-<asn>,[<ip>]:<port>"`. The brackets are required for
    /// readability in the canonical form but IPv4 (and, best-effort, IPv6)
    /// are accepted unbracketed.
    fn from_str(s: &str) -> Result<Self> {
        let (scope, rest) = s
            .split_once(',')
            .ok_or_else(|| Error::Parse(format!("not a SCION address: {}", s)))?;
        let isd_as: IsdAsn = scope.parse()?;

        let (host_s, port_s) = split_ip_port(rest)
            .ok_or_else(|| Error::Parse(format!("not a SCION address: {}", s)))?;

        let host: IpAddr = host_s
            .parse()
            .map_err(|_| Error::Parse(format!("invalid host IP: {}", host_s)))?;
        let port: u16 = port_s
            .parse()
            .map_err(|_| Error::Parse(format!("invalid port: {}", port_s)))?;

        Ok(Self { isd_as, host, port })
    }
}

impl fmt::Display for PathAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical form always brackets the IP
        write!(f, "{},[{}]:{}", self.isd_as, self.host, self.port)
    }
}

/// Split the `"[ip]:port"` or `"ip:port"` tail of a SCION address.
///
/// Returns the IP text without brackets. Unbracketed input splits at the
/// last colon, which accepts bare IPv6 on a best-effort basis.
fn split_ip_port(s: &str) -> Option<(&str, &str)> {
    if let Some(rest) = s.strip_prefix('[') {
        let (ip, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return Some((ip, port));
    }
    let idx = s.rfind(':')?;
    let (ip, port) = (&s[..idx], &s[idx + 1..]);
    if ip.is_empty() || ip.contains(['[', ']']) {
        return None;
    }
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((ip, port))
}

/// Report whether `s` is a well-formed SCION address string.
///
/// Never fails; malformed input yields `false`.
pub fn is_path_address(s: &str) -> bool {
    s.parse::<PathAddr>().is_ok()
}

/// Split `host:port`, accepting SCION addresses as well.
///
/// The classic RFC-style split is tried first; if it refuses the input
/// (SCION addresses are not valid host:port pairs), a SCION-aware split is
/// attempted. For SCION input the returned host keeps the scope and the IP
/// brackets, e.g. `"1-ff00:0:110,[127.0.0.1]"`.
pub fn split_host_port(s: &str) -> Result<(String, String)> {
    if let Ok((host, port)) = classic_split_host_port(s) {
        return Ok((host, port));
    }
    path_split_host_port(s)
}

/// Join `host` and `port`, avoiding extra brackets for SCION hosts.
///
/// A SCION host (`"1-ff00:0:110,[::1]"`) already carries its own brackets,
/// so it is joined with a bare colon; anything else gets classic IPv6-safe
/// bracketed joining.
pub fn join_host_port(host: &str, port: &str) -> String {
    if is_path_host(host) {
        return format!("{}:{}", host, port);
    }
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Classic host:port split with standard bracket and colon rules: bracketed
/// hosts have the brackets stripped, an unbracketed host may contain no
/// colon. The port is not validated, matching standard splitters.
fn classic_split_host_port(s: &str) -> Result<(String, String)> {
    let missing_port = || Error::Parse(format!("address {}: missing port", s));

    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| Error::Parse(format!("address {}: missing ']'", s)))?;
        let port = tail.strip_prefix(':').ok_or_else(missing_port)?;
        if port.contains([':', '[', ']']) {
            return Err(Error::Parse(format!("address {}: invalid port", s)));
        }
        return Ok((host.to_string(), port.to_string()));
    }

    let idx = s.rfind(':').ok_or_else(missing_port)?;
    let (host, port) = (&s[..idx], &s[idx + 1..]);
    if host.contains(':') {
        return Err(Error::Parse(format!("address {}: too many colons", s)));
    }
    if host.contains(['[', ']']) || port.contains(['[', ']']) {
        return Err(Error::Parse(format!("address {}: invalid character", s)));
    }
    Ok((host.to_string(), port.to_string()))
}

/// SCION-aware split: peel the port off the address tail while keeping the
/// scope and the IP brackets in the host.
fn path_split_host_port(s: &str) -> Result<(String, String)> {
    let (scope, rest) = s
        .split_once(',')
        .ok_or_else(|| Error::Parse(format!("address {}: not host:port", s)))?;
    scope.parse::<IsdAsn>()?;

    let (ip, port) = split_ip_port(rest)
        .ok_or_else(|| Error::Parse(format!("address {}: not host:port", s)))?;
    ip.parse::<IpAddr>()
        .map_err(|_| Error::Parse(format!("invalid host IP: {}", ip)))?;

    let host_len = s.len() - port.len() - 1;
    Ok((s[..host_len].to_string(), port.to_string()))
}

/// Heuristic check for a SCION host (the host portion without a port).
///
/// Looks for a `:` or `,` and then re-parses with a placeholder port. This
/// is string sniffing, not a grammar; junk routing scopes fail the re-parse
/// and fall through to `false`.
fn is_path_host(host: &str) -> bool {
    if host.contains(':') || host.contains(',') {
        return format!("{}:0", host).parse::<PathAddr>().is_ok();
    }
    false
}
