//! Authoritative DNS server for the delegated zone.
//!
//! # Dynamic TXT Records
//!
//! A `TXT` query is answered with the values published for the query's first label through the
//! [`/update` API endpoint][crate::api#update-post], newest first, with a TTL of one second.
//!
//! E.g. with config:
//! ```json
//! {
//!   "domain": "auth.example.org",
//!   ...
//! }
//! ```
//!
//! After an account holding the subdomain `d420c923-bbd7-4056-ab64-c3ca54c9b3cf` publishes a
//! value, a `TXT` query for its full domain returns it:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short d420c923-bbd7-4056-ab64-c3ca54c9b3cf.auth.example.org TXT
//! "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"
//! ```
//!
//! A `CNAME` from `_acme-challenge.<your domain>` to that full domain lets an ACME server
//! validate `<your domain>` against this zone.
//!
//! # Own Challenge
//!
//! `_acme-challenge.<domain>` is reserved for the server's own certificate. `TXT` queries for it
//! are answered from a value presented through a [`ChallengeProvider`], never from the store.
//! With nothing presented the answer is a single `TXT` record with an empty payload.
//!
//! # Static Records
//!
//! [`Config::records`][crate::config::Config::records] lists records in zone file syntax,
//! `<name> [ttl] [IN] <TYPE> <rdata>`, for the types `A`, `AAAA`, `CNAME`, `NS` and `TXT`:
//!
//! ```json
//!   "records": [
//!     "auth.example.org. A 192.0.2.10",
//!     "ns1.auth.example.org. 300 IN A 192.0.2.11",
//!     "auth.example.org. NS ns1.auth.example.org."
//!   ]
//! ```
//!
//! Queries for a name without a record of the asked type fall back to the name's `CNAME`.
//! Lines that can't be parsed are logged and skipped.
//!
//! ## SOA
//!
//! The zone apex always carries a SOA built from
//! [`Config::ns_domain`][crate::config::Config::ns_domain] and
//! [`Config::ns_admin`][crate::config::Config::ns_admin]:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 auth.example.org +short SOA
//! ns1.auth.example.org. dns\.admin.example.org. 2024031514 28800 7200 604800 86400
//! ```
//!
//! _Note: The zone serial is the hour the server started, as `YYYYMMDDHH`._
//!
//! # Response Codes
//!
//! Names in or under the zone are answered authoritatively. An authoritative `NXDOMAIN`
//! carries the SOA in its authority section. Requests other than standard queries get
//! `NOTIMP`, and requests with an EDNS version other than 0 get `BADVERS`.

mod challenge;
mod handlers;
pub mod records;
pub mod resolver;
pub mod server;

pub use challenge::{key_authorization_digest, ChallengeProvider, OwnChallenge};
pub use handlers::Handler;
pub use server::{new, DnsServers};
