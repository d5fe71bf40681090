//! Source address whitelist.

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::warn;

/// An ordered list of exempt networks, mixed address families allowed.
///
/// Entries that fail to parse as networks are skipped with a warning rather
/// than rejected. An address that itself fails to parse as an IP literal is
/// reported as not whitelisted, so detection proceeds for it (fail-open, a
/// deliberate choice preserved from the reference behavior).
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    networks: Vec<IpNet>,
}

impl Whitelist {
    /// Builds a whitelist from CIDR strings, skipping unparsable entries.
    ///
    /// Bare addresses (`127.0.0.1`) are accepted as host networks.
    #[must_use]
    pub fn new(entries: &[String]) -> Self {
        let mut networks = Vec::with_capacity(entries.len());
        for entry in entries {
            match parse_entry(entry) {
                Some(net) => networks.push(net),
                None => warn!(entry = %entry, "skipping unparsable whitelist entry"),
            }
        }
        Self { networks }
    }

    /// Whether the address falls inside any configured network.
    #[must_use]
    pub fn is_whitelisted(&self, addr: &str) -> bool {
        let Ok(ip) = addr.parse::<IpAddr>() else {
            return false;
        };
        self.networks.iter().any(|net| net.contains(&ip))
    }

    /// Number of usable networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether no usable networks are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

fn parse_entry(entry: &str) -> Option<IpNet> {
    if let Ok(net) = entry.parse::<IpNet>() {
        return Some(net);
    }
    // Accept a bare address as a host network.
    entry.parse::<IpAddr>().ok().map(IpNet::from)
}
