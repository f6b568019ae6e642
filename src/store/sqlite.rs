//! A SQLite-backed implementation of the [`AccountStore`][super::AccountStore] trait.
use crate::account::{password, Account, CidrList, Registration, TxtRecord};
use crate::error::Error;
use crate::store::{schema, AccountStore, MAX_TXT_VALUES};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// The production [`AccountStore`].
///
/// A single connection is shared behind a mutex and only ever used from blocking tasks, so slow
/// disk IO never stalls the async runtime. Contended database locks are waited on for at most
/// the busy timeout given at open, after which the call fails instead of hanging.
#[derive(Clone, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, upgrading its schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the database can't be opened, and any error of the schema
    /// upgrade. A store that fails to upgrade must not be served.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::new(conn)
    }

    /// Wrap an already open connection, upgrading its schema if needed.
    ///
    /// # Errors
    ///
    /// Returns any error of the schema upgrade.
    pub fn new(mut conn: Connection) -> Result<Self, Error> {
        schema::upgrade(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// The schema version recorded in the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the version can't be read.
    pub async fn schema_version(&self) -> Result<Option<i64>, Error> {
        self.with_conn(|conn| schema::stored_version(conn)).await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| Error::StorePoisoned)?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait::async_trait]
impl AccountStore for SqliteStore {
    async fn register(&self, allow_from: &CidrList) -> Result<Registration, Error> {
        let registration = Registration::generate(allow_from);
        let key = registration.key.clone();
        let key_hash = tokio::task::spawn_blocking(move || password::hash_key(&key)).await??;
        let allow_from = serde_json::to_string(&registration.allow_from)?;
        let (username, subdomain) = (
            registration.username.to_string(),
            registration.subdomain.clone(),
        );

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO records (Username, Password, Subdomain, AllowFrom)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, key_hash, subdomain, allow_from],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        Ok(registration)
    }

    async fn get_by_username(&self, username: Uuid) -> Result<Option<Account>, Error> {
        let row = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT Username, Password, Subdomain, AllowFrom
                         FROM records WHERE Username = ?1 LIMIT 1",
                        params![username.to_string()],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, Option<String>>(3)?,
                            ))
                        },
                    )
                    .optional()?)
            })
            .await?;

        let Some((stored_username, key_hash, subdomain, allow_from)) = row else {
            return Ok(None);
        };
        let username = Uuid::try_parse(&stored_username)
            .map_err(|_| Error::CorruptAccount(stored_username.clone()))?;
        let allow_from = match allow_from.as_deref() {
            None | Some("") => CidrList::default(),
            Some(json) => serde_json::from_str(json)
                .map_err(|_| Error::CorruptAccount(stored_username.clone()))?,
        };
        Ok(Some(Account {
            username,
            key_hash,
            subdomain,
            allow_from,
        }))
    }

    async fn get_txt(&self, subdomain: &str) -> Result<Vec<String>, Error> {
        let subdomain = subdomain.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT Value FROM txt
                 WHERE Subdomain = ?1 AND Value != ''
                 ORDER BY LastUpdate DESC, rowid DESC
                 LIMIT ?2",
            )?;
            #[allow(clippy::cast_possible_wrap)]
            let rows = stmt.query_map(params![subdomain, MAX_TXT_VALUES as i64], |row| {
                row.get::<_, String>(0)
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn add_txt(&self, record: &TxtRecord) -> Result<(), Error> {
        let record = record.clone();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO txt (Subdomain, Value, LastUpdate) VALUES (?1, ?2, ?3)",
                params![record.subdomain, record.value, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_txt(&self, record: &TxtRecord) -> Result<(), Error> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM txt WHERE Subdomain = ?1 AND Value = ?2",
                params![record.subdomain, record.value],
            )?;
            Ok(())
        })
        .await
    }
}
