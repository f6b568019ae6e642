//! Durable account and TXT record storage.
//!
//! Both the [HTTP API][crate::api] (which registers accounts and publishes values) and the
//! [DNS server][crate::dns] (which answers with them) talk to storage only through the
//! [`AccountStore`] trait.
//!
//! Two implementations are provided, [`sqlite::SqliteStore`] and [`memory::InMemoryStore`]. The
//! former is the production store and upgrades its schema on open. The latter is not durable
//! across restarts and is mostly useful for tests.
//!
//! TXT values are append-only: publishing a value never overwrites an earlier one. Lookups
//! return at most [`MAX_TXT_VALUES`] non-empty values, newest first, so stale values fall out of
//! answers without anybody deleting them. Clients that do clean up may delete a specific value.

use crate::account::{Account, CidrList, Registration, TxtRecord};
use crate::error::Error;
use std::sync::Arc;
use uuid::Uuid;

pub mod memory;
mod schema;
pub mod sqlite;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryStore;
pub use schema::SCHEMA_VERSION;
#[allow(clippy::module_name_repetitions)]
pub use sqlite::SqliteStore;

/// Upper bound on the number of TXT values returned for one subdomain.
pub const MAX_TXT_VALUES: usize = 100;

/// `DynAccountStore` is a type alias for an [`AccountStore`] shared between the DNS and HTTP
/// tasks. Implementations synchronise internally.
#[allow(clippy::module_name_repetitions)]
pub type DynAccountStore = Arc<dyn AccountStore + Send + Sync>;

/// An async trait describing storage of accounts and the [RFC-8555][RFC-8555] [DNS-01]
/// challenge response values they publish.
///
/// Every write is atomic with respect to concurrent readers, and every call returns (possibly
/// with an error) in bounded time rather than hanging on a busy backend.
///
/// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
/// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
#[async_trait::async_trait]
pub trait AccountStore {
    /// Create an account with fresh random credentials, storing only a hash of its key.
    async fn register(&self, allow_from: &CidrList) -> Result<Registration, Error>;

    /// Look up an account by identity.
    async fn get_by_username(&self, username: Uuid) -> Result<Option<Account>, Error>;

    /// Up to [`MAX_TXT_VALUES`] non-empty TXT values for `subdomain`, newest first.
    async fn get_txt(&self, subdomain: &str) -> Result<Vec<String>, Error>;

    /// Publish an additional TXT value for a subdomain.
    async fn add_txt(&self, record: &TxtRecord) -> Result<(), Error>;

    /// Remove every entry of the subdomain equal to the record's value.
    async fn delete_txt(&self, record: &TxtRecord) -> Result<(), Error>;
}
