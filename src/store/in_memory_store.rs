use std::sync::{Arc, Mutex};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::account::{Account, AccountId};

use super::{AccountHandle, AccountStore, StoreError};

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, AccountHandle>,
    sessions: DashMap<String, AccountId>,
}

impl InMemoryAccountStore {
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self, StoreError> {
        let store = Self::default();
        for account in accounts {
            store.insert(account)?;
        }
        Ok(store)
    }

    pub fn insert(&self, account: Account) -> Result<(), StoreError> {
        let session = match self.sessions.entry(account.session_token.clone()) {
            Entry::Occupied(entry) => {
                return Err(StoreError::DuplicateSessionToken {
                    id: entry.get().clone(),
                });
            }
            Entry::Vacant(entry) => entry,
        };
        let Entry::Vacant(slot) = self.accounts.entry(account.id.clone()) else {
            return Err(StoreError::DuplicateAccount { id: account.id });
        };
        session.insert(account.id.clone());
        tracing::debug!(id = %account.id, "account registered");
        slot.insert(Arc::new(Mutex::new(account)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find_by_id(&self, id: &str) -> Option<AccountHandle> {
        self.accounts.get(id).map(|acc| Arc::clone(acc.value()))
    }

    fn find_by_session_token(&self, token: &str) -> Option<AccountHandle> {
        let id = self.sessions.get(token)?.value().clone();
        self.find_by_id(&id)
    }
}
