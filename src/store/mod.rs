use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::account::Account;

pub mod in_memory_store;

/// Shared account record. Holding the guard serializes every balance
/// mutation on that account.
pub type AccountHandle = Arc<Mutex<Account>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account `{id}` already exists")]
    DuplicateAccount { id: String },
    #[error("Session token is already bound to account `{id}`")]
    DuplicateSessionToken { id: String },
}

pub trait AccountStore: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<AccountHandle>;

    fn find_by_session_token(&self, token: &str) -> Option<AccountHandle>;
}

impl<S: AccountStore + ?Sized> AccountStore for Arc<S> {
    fn find_by_id(&self, id: &str) -> Option<AccountHandle> {
        (**self).find_by_id(id)
    }

    fn find_by_session_token(&self, token: &str) -> Option<AccountHandle> {
        (**self).find_by_session_token(token)
    }
}

/// A panic while holding the lock leaves the balance in a consistent state,
/// since mutations are a single `apply`, so poisoning is ignored.
pub fn lock(handle: &AccountHandle) -> MutexGuard<'_, Account> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
