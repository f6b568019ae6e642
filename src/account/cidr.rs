use crate::error::Error;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

/// An ordered list of CIDR network strings an account may be updated from.
///
/// The list is kept as the strings the client registered with, so that entries which fail to
/// parse are simply ignored at match time instead of making the whole account unusable. An
/// empty list (or one without a single valid entry) places no restriction on the source
/// address.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct CidrList(Vec<String>);

impl CidrList {
    pub fn new(entries: Vec<String>) -> Self {
        Self(entries)
    }

    /// Fail with [`Error::InvalidCidr`] naming the first entry that isn't a CIDR network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCidr`] for the first malformed entry.
    pub fn validate(&self) -> Result<(), Error> {
        match self.0.iter().find(|entry| parse_cidr(entry).is_none()) {
            Some(entry) => Err(Error::InvalidCidr(entry.clone())),
            None => Ok(()),
        }
    }

    /// The entries that parse as CIDR networks, with IPv6 brackets stripped.
    #[must_use]
    pub fn valid_entries(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|entry| parse_cidr(entry).is_some())
            .map(|entry| unbracket(entry).into_owned())
            .collect()
    }

    pub fn networks(&self) -> impl Iterator<Item = IpNetwork> + '_ {
        self.0.iter().filter_map(|entry| parse_cidr(entry))
    }

    /// Whether `ip` falls within any listed network. Always true for an unrestricted list.
    #[must_use]
    pub fn allows(&self, ip: IpAddr) -> bool {
        self.is_unrestricted() || self.networks().any(|network| network.contains(ip))
    }

    /// Whether any of the (textual, possibly bracketed) addresses in `candidates` is allowed.
    ///
    /// An empty candidate list only passes when the allow list is unrestricted. Candidates that
    /// don't parse as IP addresses never match.
    pub fn allows_any<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        candidates
            .into_iter()
            .filter_map(parse_ip)
            .any(|ip| self.allows(ip))
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.networks().next().is_none()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<&str>> for CidrList {
    fn from(entries: Vec<&str>) -> Self {
        Self(entries.into_iter().map(str::to_string).collect())
    }
}

/// Parse a strict `address/prefix` network. Unlike [`IpNetwork::from_str`] this refuses bare
/// addresses and abbreviated IPv4 forms such as `10/8`.
fn parse_cidr(entry: &str) -> Option<IpNetwork> {
    let entry = unbracket(entry);
    let (addr, prefix) = entry.split_once('/')?;
    let addr = IpAddr::from_str(addr).ok()?;
    let prefix = u8::from_str(prefix).ok()?;
    IpNetwork::new(addr, prefix).ok()
}

pub(crate) fn parse_ip(candidate: &str) -> Option<IpAddr> {
    let candidate = candidate.trim();
    let candidate = candidate
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(candidate);
    IpAddr::from_str(candidate).ok()
}

// "[::1]/128" -> "::1/128"
fn unbracket(entry: &str) -> std::borrow::Cow<'_, str> {
    let entry = entry.trim();
    if entry.starts_with('[') {
        std::borrow::Cow::Owned(entry.replacen('[', "", 1).replacen(']', "", 1))
    } else {
        std::borrow::Cow::Borrowed(entry)
    }
}
