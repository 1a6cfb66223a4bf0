//! Source URL validation (SSRF protection)
//!
//! A source URL is accepted when it uses HTTPS, or when its host is one of
//! the loopback literals as written (`localhost`, `127.0.0.1`, `::1`), in which case any
//! scheme is allowed and no further check runs. For every other host the
//! name is resolved and each resolved address is checked against a fixed
//! blocklist, so a harmless-looking name cannot point at internal
//! infrastructure or a cloud metadata service.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tracing::debug;
use url::{Host, Url};

/// Errors raised while validating a source URL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceUrlError {
    #[error("source URL cannot be empty")]
    Empty,

    #[error("invalid URL: {0}")]
    Parse(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("only HTTPS URLs are allowed (got {0})")]
    HttpsRequired(String),

    #[error("failed to resolve hostname: {0}")]
    Resolution(String),

    #[error("URLs pointing to private networks are not allowed ({0})")]
    PrivateNetwork(IpAddr),
}

impl SourceUrlError {
    /// Whether this is a policy denial rather than a malformed input
    pub fn is_security_denial(&self) -> bool {
        matches!(self, Self::HttpsRequired(_) | Self::PrivateNetwork(_))
    }
}

/// Hostname to address resolution
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// A CIDR block in the blocklist
#[derive(Debug, Clone, Copy)]
struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    const fn v4(octets: [u8; 4], prefix: u8) -> Self {
        Self {
            network: IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3])),
            prefix,
        }
    }

    const fn v6(segments: [u16; 8], prefix: u8) -> Self {
        let [a, b, c, d, e, f, g, h] = segments;
        Self {
            network: IpAddr::V6(Ipv6Addr::new(a, b, c, d, e, f, g, h)),
            prefix,
        }
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(ip)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix))
                    .unwrap_or(0);
                u32::from(network) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(ip)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix))
                    .unwrap_or(0);
                u128::from(network) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

/// Private, reserved and cloud metadata ranges
const BLOCKED_NETWORKS: &[Cidr] = &[
    Cidr::v4([10, 0, 0, 0], 8),
    Cidr::v4([172, 16, 0, 0], 12),
    Cidr::v4([192, 168, 0, 0], 16),
    Cidr::v4([127, 0, 0, 0], 8),
    Cidr::v4([169, 254, 0, 0], 16),
    Cidr::v4([0, 0, 0, 0], 8),
    // AWS/GCP/Azure metadata
    Cidr::v4([169, 254, 169, 254], 32),
    // AWS IMDS over IPv6
    Cidr::v6([0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254], 128),
];

/// Check if an IP address is in a private or reserved range
pub fn is_private_ip(ip: IpAddr) -> bool {
    // ::ffff:a.b.c.d must be judged as a.b.c.d
    let ip = match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };

    if BLOCKED_NETWORKS.iter().any(|cidr| cidr.contains(ip)) {
        return true;
    }

    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }

    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_link_local()
                // link-local multicast 224.0.0.0/24
                || (v4.octets()[0] == 224 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link-local unicast
                || (first & 0xff0f) == 0xff02 // link-local multicast
        }
    }
}

fn host_string(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// Host as written in the input, without userinfo, port or IPv6 brackets
fn written_host(raw_url: &str) -> Option<&str> {
    let (_, rest) = raw_url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    if let Some(bracketed) = host_port.strip_prefix('[') {
        return bracketed.split_once(']').map(|(host, _)| host);
    }
    Some(host_port.split_once(':').map_or(host_port, |(host, _)| host))
}

/// Exact spellings only; `LOCALHOST` or `127.1` go through the full check
fn is_loopback_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Validate that a source URL is safe to hand to the package manager
pub async fn validate_source_url(
    raw_url: &str,
    resolver: &dyn HostResolver,
) -> Result<(), SourceUrlError> {
    if raw_url.is_empty() {
        return Err(SourceUrlError::Empty);
    }

    let url = Url::parse(raw_url).map_err(|e| SourceUrlError::Parse(e.to_string()))?;
    let is_localhost = written_host(raw_url).is_some_and(is_loopback_host);

    if url.scheme() != "https" && !is_localhost {
        return Err(SourceUrlError::HttpsRequired(url.scheme().to_string()));
    }

    // Local feeds are intentionally reachable over plain HTTP
    if is_localhost {
        return Ok(());
    }

    let host = host_string(&url).ok_or(SourceUrlError::MissingHost)?;

    let ips = resolver
        .resolve(&host)
        .await
        .map_err(|e| SourceUrlError::Resolution(e.to_string()))?;

    if ips.is_empty() {
        return Err(SourceUrlError::Resolution(format!(
            "no addresses found for {}",
            host
        )));
    }

    if let Some(ip) = ips.iter().copied().find(|ip| is_private_ip(*ip)) {
        return Err(SourceUrlError::PrivateNetwork(ip));
    }

    debug!(host = %host, addresses = ips.len(), "source URL validated");
    Ok(())
}
