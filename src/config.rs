use crate::error::Error;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_server::client::rr::{LowerName, Name};

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// The zone this server is authoritative for, and under which subdomains are delegated.
    pub domain: Name,
    pub ns_domain: Name,
    /// Zone admin mailbox, either as `user@example.com` or `user.example.com`.
    pub ns_admin: String,
    /// Static records, one per string: `<name> [ttl] [IN] <TYPE> <rdata>`.
    #[serde(default)]
    pub records: Vec<String>,
    /// SQLite database file, or `:memory:`.
    pub database_path: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_busy_timeout")]
    pub database_busy_timeout: Duration,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    #[serde(default)]
    pub disable_registration: bool,
    /// Take the client address from `header_name` (set by a trusted reverse proxy) instead of
    /// the TCP peer address.
    #[serde(default)]
    pub use_header: bool,
    #[serde(default = "default_header_name")]
    pub header_name: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub dns_udp_bind_addr: SocketAddr,
    pub dns_tcp_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dns_tcp_timeout: Duration,
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_header_name() -> String {
    "X-Forwarded-For".to_string()
}

impl Config {
    /// Load a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read and [`Error::InvalidJSON`] if it isn't a
    /// valid config document.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        Ok(conf)
    }

    /// The configured zone as a lowercase FQDN.
    #[must_use]
    pub fn own_domain(&self) -> LowerName {
        LowerName::new(&fqdn(&self.domain))
    }

    /// `<subdomain>.<domain>`, as handed out at registration.
    #[must_use]
    pub fn full_domain(&self, subdomain: &str) -> String {
        format!("{subdomain}.{}", self.own_domain())
            .trim_end_matches('.')
            .to_string()
    }

    /// The SOA RNAME for [`Config::ns_admin`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if the admin address isn't a valid name.
    pub fn ns_admin(&self) -> Result<Name, Error> {
        Ok(fqdn(&Name::from_str(&self.sanitized_ns_admin())?))
    }

    fn sanitized_ns_admin(&self) -> Cow<str> {
        match self.ns_admin.split_once('@') {
            Some((user, domain)) => {
                let user = user.replace('.', "\\.");
                Cow::Owned(format!("{user}.{domain}"))
            }
            _ => Cow::Borrowed(&self.ns_admin),
        }
    }
}

/// Lowercase `name` and mark it fully qualified, so names from config, from the wire and from
/// tests compare and hash alike.
#[must_use]
pub fn fqdn(name: &Name) -> Name {
    let mut name = name.to_lowercase();
    name.set_fqdn(true);
    name
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_CONFIG: &str = r#"{
        "domain": "Auth.Example.Org",
        "ns_domain": "ns1.auth.example.org",
        "ns_admin": "dns.admin@example.org",
        "records": [
            "auth.example.org. A 192.0.2.10",
            "ns1.auth.example.org 300 IN A 192.0.2.11",
            "auth.example.org. NS ns1.auth.example.org.",
            "www.auth.example.org. CNAME auth.example.org.",
            "static.auth.example.org. TXT \"hello world\"",
            "broken record line"
        ],
        "database_path": ":memory:",
        "api_bind_addr": "127.0.0.1:8080",
        "api_timeout": 5,
        "use_header": true,
        "dns_udp_bind_addr": "127.0.0.1:0",
        "dns_tcp_bind_addr": "127.0.0.1:0",
        "dns_tcp_timeout": 5
    }"#;

    pub(crate) fn test_config() -> Config {
        serde_json::from_str(TEST_CONFIG).unwrap()
    }

    #[test]
    fn defaults_and_names() {
        let config = test_config();
        assert_eq!(config.own_domain().to_string(), "auth.example.org.");
        assert_eq!(config.full_domain("abc"), "abc.auth.example.org");
        assert_eq!(config.header_name, "X-Forwarded-For");
        assert_eq!(config.database_busy_timeout, Duration::from_secs(5));
        assert!(!config.disable_registration);
        assert!(config.use_header);
        assert_eq!(config.records.len(), 6);
    }

    #[test]
    fn ns_admin_forms() {
        let mut config = test_config();
        assert_eq!(config.ns_admin().unwrap().to_string(), "dns\\.admin.example.org.");
        config.ns_admin = "hostmaster.example.org".to_string();
        assert_eq!(config.ns_admin().unwrap().to_string(), "hostmaster.example.org.");
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"domain": "example.org"}"#).is_err());
    }
}
