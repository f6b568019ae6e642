//! ACME Delegate
//!
//! A self-hosted delegation nameserver for [RFC-8555][RFC-8555] [DNS-01] challenges, in the
//! spirit of [acme-dns].
//!
//! A domain's `_acme-challenge` record is `CNAME`d once to a random subdomain of the zone this
//! server is authoritative for. ACME clients then publish challenge response values through a
//! small credentialed [HTTP API][crate::api] instead of touching the domain's primary DNS
//! provider, and the [DNS server][crate::dns] answers validation queries with them.
//!
//! [acme-dns]: https://github.com/joohoi/acme-dns
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod account;
pub mod api;
pub mod config;
pub mod dns;
pub mod error;
pub mod store;

pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use dns::new as new_dns;
pub use store::{DynAccountStore, InMemoryStore, SqliteStore};
