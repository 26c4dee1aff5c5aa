//! Loopback and local-host classification.
//!
//! Two related questions are answered here:
//!
//! - [`is_loopback`]: does this address (literal or hostname) identify the
//!   machine to itself? Used to gate loopback-only routes, so every
//!   ambiguous case answers `false`.
//! - [`is_local_host`]: should a command aimed at this host run on this
//!   machine? Pure string classification against the machine's current
//!   hostname, with no DNS.

use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use tracing::debug;

/// Parse a literal IPv4 or IPv6 address. Bracketed IPv6 (`[::1]`) is accepted.
pub fn parse_literal(address: &str) -> Option<IpAddr> {
    let trimmed = address
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(address);
    trimmed.parse::<IpAddr>().ok()
}

/// Loopback test for a literal address: `127.0.0.0/8` or exactly `::1`.
///
/// IPv4-mapped IPv6 addresses are not unwrapped.
pub fn is_loopback_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.octets()[0] == 127,
        IpAddr::V6(v6) => v6 == Ipv6Addr::LOCALHOST,
    }
}

/// True only if every resolved record is a loopback address.
/// An empty record set is not loopback.
pub fn all_loopback(addrs: &[SocketAddr]) -> bool {
    !addrs.is_empty() && addrs.iter().all(|addr| is_loopback_ip(addr.ip()))
}

/// Classify `address` as loopback.
///
/// Literal addresses are checked directly. Anything else is resolved as a
/// hostname for both address families; the hostname is loopback only if the
/// resolution is unanimous. A resolution failure is not an error: the address
/// is simply not loopback.
pub async fn is_loopback(address: &str) -> bool {
    is_loopback_resolved_by(address, |host| async move {
        tokio::net::lookup_host((host.as_str(), 0))
            .await
            .map(|records| records.collect())
    })
    .await
}

/// [`is_loopback`] with the hostname lookup supplied by the caller.
pub(crate) async fn is_loopback_resolved_by<F, Fut>(address: &str, resolve: F) -> bool
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = io::Result<Vec<SocketAddr>>>,
{
    if let Some(ip) = parse_literal(address) {
        return is_loopback_ip(ip);
    }

    match resolve(address.to_string()).await {
        Ok(addrs) => {
            let loopback = all_loopback(&addrs);
            debug!(
                address,
                records = addrs.len(),
                loopback,
                "Resolved hostname for loopback check"
            );
            loopback
        }
        Err(err) => {
            debug!(address, error = %err, "Address resolution failed; treating as not loopback");
            false
        }
    }
}

/// The machine's hostname, read fresh on every call.
pub fn local_hostname() -> Option<String> {
    #[cfg(unix)]
    {
        nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
    }
    #[cfg(not(unix))]
    {
        std::env::var("COMPUTERNAME")
            .ok()
            .filter(|name| !name.is_empty())
    }
}

/// Whether a command targeting `host` should run on this machine.
///
/// Local means `localhost`, a literal loopback address, or the machine's own
/// hostname (compared case-insensitively).
pub fn is_local_host(host: &str) -> bool {
    is_local_host_named(host, local_hostname().as_deref())
}

pub(crate) fn is_local_host_named(host: &str, hostname: Option<&str>) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    if let Some(ip) = parse_literal(host) {
        return is_loopback_ip(ip);
    }
    hostname.is_some_and(|name| name.eq_ignore_ascii_case(host))
}
