//! SSRF checks for `publicUrl` sources
//!
//! A URL is only fetched when its scheme is http(s), its host passes the optional domain
//! allowlist, and neither the literal host nor any address it resolves to is private,
//! loopback or otherwise internal. Private targets can be enabled for local setups.

use proofsub_core::IntakeConfig;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::net::lookup_host;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlRejection {
    #[error("URL must start with http:// or https://")]
    UnsupportedScheme,

    #[error("Invalid URL format: {0}")]
    Malformed(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL hostname '{0}' is not in the allowed list")]
    NotAllowlisted(String),

    #[error("Private/internal IP addresses are not allowed")]
    PrivateAddress,

    #[error("Localhost and internal hostnames are not allowed")]
    InternalHostname,

    #[error("Hostname resolves to private/internal IP address: {0}")]
    ResolvesToPrivate(IpAddr),
}

impl UrlRejection {
    /// The URL itself is unusable, as opposed to pointing somewhere the policy forbids.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            UrlRejection::UnsupportedScheme | UrlRejection::Malformed(_) | UrlRejection::MissingHost
        )
    }
}

/// Which remote hosts may be fetched.
#[derive(Debug, Clone, Copy)]
pub struct UrlPolicy<'a> {
    allow_private: bool,
    allowlist: Option<&'a [String]>,
}

impl<'a> UrlPolicy<'a> {
    pub fn new(allow_private: bool, allowlist: Option<&'a [String]>) -> Self {
        Self {
            allow_private,
            allowlist,
        }
    }

    pub fn from_intake(intake: &'a IntakeConfig) -> Self {
        Self::new(
            intake.url_fetch_allow_private,
            intake.url_fetch_allowlist.as_deref(),
        )
    }

    /// Validate `url` and return it parsed.
    pub async fn check(&self, url: &str) -> Result<reqwest::Url, UrlRejection> {
        let parsed = reqwest::Url::parse(url.trim()).map_err(|e| UrlRejection::Malformed(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(UrlRejection::UnsupportedScheme);
        }

        let host = parsed
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_lowercase())
            .filter(|h| !h.is_empty())
            .ok_or(UrlRejection::MissingHost)?;

        if let Some(allowed) = self.allowlist {
            if !host_is_allowlisted(&host, allowed) {
                return Err(UrlRejection::NotAllowlisted(host));
            }
        }

        if self.allow_private {
            return Ok(parsed);
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            if is_private_ip(&ip) {
                return Err(UrlRejection::PrivateAddress);
            }
        } else if is_internal_hostname(&host) {
            return Err(UrlRejection::InternalHostname);
        }

        // Resolved addresses are checked too, so a public name pointing inward is refused.
        let port = parsed.port_or_known_default().unwrap_or(80);
        match lookup_host((host.as_str(), port)).await {
            Ok(addrs) => {
                for addr in addrs {
                    if is_private_ip(&addr.ip()) {
                        return Err(UrlRejection::ResolvesToPrivate(addr.ip()));
                    }
                }
            }
            Err(e) => {
                // The download itself will fail and be reported as an upstream error.
                tracing::warn!(host = %host, error = %e, "Failed to resolve hostname for SSRF validation");
            }
        }

        Ok(parsed)
    }
}

/// Exact match or subdomain of an allowlisted domain.
fn host_is_allowlisted(host: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|allowed| {
        let allowed = allowed.trim().to_lowercase();
        host == allowed || host.ends_with(&format!(".{}", allowed))
    })
}

fn is_internal_hostname(host: &str) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
        || host.contains(".internal.")
        || host.ends_with(".corp")
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_ipv4(&v4),
            None => is_private_ipv6(v6),
        },
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.octets()[0] == 0
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || first & 0xffc0 == 0xfe80 // link-local fe80::/10
        || first & 0xfe00 == 0xfc00 // unique local fc00::/7
}
