use crate::account::{password, Account, CidrList, Registration, TxtRecord};
use crate::error::Error;
use crate::store::{AccountStore, MAX_TXT_VALUES};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A volatile [`AccountStore`]. Nothing survives a restart.
#[derive(Default, Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

#[derive(Default, Debug)]
struct State {
    accounts: HashMap<Uuid, Account>,
    // Newest value at the front.
    txt_records: HashMap<String, VecDeque<String>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryStore {
    async fn register(&self, allow_from: &CidrList) -> Result<Registration, Error> {
        let registration = Registration::generate(allow_from);
        let account = Account {
            username: registration.username,
            key_hash: password::hash_key(&registration.key)?,
            subdomain: registration.subdomain.clone(),
            allow_from: registration.allow_from.clone(),
        };
        self.state
            .write()
            .await
            .accounts
            .insert(account.username, account);
        Ok(registration)
    }

    async fn get_by_username(&self, username: Uuid) -> Result<Option<Account>, Error> {
        Ok(self.state.read().await.accounts.get(&username).cloned())
    }

    async fn get_txt(&self, subdomain: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .state
            .read()
            .await
            .txt_records
            .get(subdomain)
            .map_or_else(Vec::default, |values| {
                values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .take(MAX_TXT_VALUES)
                    .cloned()
                    .collect()
            }))
    }

    async fn add_txt(&self, record: &TxtRecord) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let values = state
            .txt_records
            .entry(record.subdomain.clone())
            .or_default();
        values.push_front(record.value.clone());
        // Anything past the cap can never be served again.
        values.truncate(MAX_TXT_VALUES);
        Ok(())
    }

    async fn delete_txt(&self, record: &TxtRecord) -> Result<(), Error> {
        if let Some(values) = self.state.write().await.txt_records.get_mut(&record.subdomain) {
            values.retain(|v| *v != record.value);
        }
        Ok(())
    }
}
