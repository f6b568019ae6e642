//! Error types.

use trust_dns_server::proto::error::ProtoError;

/// Error enumerates the possible error states of the delegation service.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned for every failed authentication or authorization check on the
    /// [`/update`][crate::api#update-post] and [`/delete`][crate::api#delete-post] endpoints.
    ///
    /// Deliberately carries no detail: unknown users, wrong keys, disallowed source
    /// addresses and subdomain mismatches must be indistinguishable to the caller.
    #[error("forbidden")]
    Forbidden,

    /// Returned when an update targets a subdomain that is not a single DNS label made of
    /// alphanumerics and hyphens.
    #[error("subdomain is not a valid DNS label")]
    BadSubdomain,

    /// Returned when an update carries a `txt` value that isn't a 43 character
    /// [RFC-8555][RFC-8555] [DNS-01] challenge response value.
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
    /// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    #[error("TXT value is not a valid DNS-01 challenge response")]
    BadTxt,

    /// Returned when a registration lists an `allowfrom` entry that isn't a CIDR network.
    #[error("invalid CIDR network: \"{0}\"")]
    InvalidCidr(String),

    /// Returned when a request body can't be read.
    #[error("unreadable request body")]
    Body(#[source] axum::BoxError),

    /// Returned when a request body is longer than the given number of bytes.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Returned when a request body isn't the expected JSON document.
    #[error("malformed JSON payload")]
    MalformedJson(#[source] serde_json::Error),

    /// Returned when the SQLite store fails to prepare, execute or scan a statement.
    #[error("database error")]
    Database(#[from] rusqlite::Error),

    /// Returned when a blocking store task panicked or was cancelled.
    #[error("store task failed")]
    StoreTask(#[from] tokio::task::JoinError),

    /// Returned when the store's connection lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    StorePoisoned,

    /// Returned when a stored allow list can't be decoded.
    #[error("corrupt account row for user {0}")]
    CorruptAccount(String),

    /// Returned when hashing or parsing a stored password hash fails.
    #[error("password hash error: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),

    /// Returned at startup when the store carries a schema version newer than this build
    /// understands. Serving against such a store is never attempted.
    #[error("unsupported database schema version {found} (newest known is {supported})")]
    UnsupportedSchema { found: i64, supported: i64 },

    /// Returned at startup when the stored schema version marker isn't a number.
    #[error("unreadable database schema version \"{0}\"")]
    InvalidSchemaVersion(String),

    /// Returned when a static record from the config can't be parsed. Such records are logged
    /// and skipped rather than preventing startup.
    #[error("invalid static record \"{record}\": {reason}")]
    InvalidRecord { record: String, reason: String },

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [trying to load a `Config`][crate::config::Config::try_from_file] fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
