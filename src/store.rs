use crate::database::{KvStore, SESSION_KEY, USERS_KEY, WATCHLIST_KEY};
use crate::error::{LoginError, RegisterError, WatchlistError};
use crate::model::Account;
use chrono::Utc;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Owns the registered accounts, the current session, and the watchlist, and
/// mirrors each to the backing [`KvStore`] after every mutation. Storage
/// failures degrade to in-memory operation with a warning; they never fail the
/// operation that triggered the write.
pub struct AccountStore<S: KvStore> {
    kv: S,
    accounts: Vec<Account>,
    session: Option<Account>,
    watchlist: Vec<String>,
}

fn hydrate<T: DeserializeOwned + Default>(kv: &impl KvStore, key: &str) -> T {
    match kv.load(key) {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!("malformed entry under {:?}, starting empty: {}", key, err);
                T::default()
            }
        },
        None => T::default(),
    }
}

impl<S: KvStore> AccountStore<S> {
    pub fn open(kv: S) -> Self {
        let accounts: Vec<Account> = hydrate(&kv, USERS_KEY);
        let session: Option<Account> = hydrate(&kv, SESSION_KEY);
        let watchlist: Vec<String> = hydrate(&kv, WATCHLIST_KEY);
        debug!(
            "hydrated {} accounts, session: {}, {} watchlist entries",
            accounts.len(),
            session.is_some(),
            watchlist.len()
        );
        AccountStore {
            kv,
            accounts,
            session,
            watchlist,
        }
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => {
                if let Err(err) = self.kv.save(key, &json) {
                    warn!("could not persist {:?}, continuing in memory: {}", key, err);
                }
            }
            Err(err) => warn!("could not serialize {:?}: {}", key, err),
        }
    }

    fn next_id(&self) -> u64 {
        // Time-derived like the ids users already have, bumped past the newest
        // existing id so a fast clock or a clock step back cannot collide.
        let id = Utc::now().timestamp_millis() as u64;
        match self.accounts.iter().map(|account| account.id).max() {
            Some(max) if id <= max => max + 1,
            _ => id,
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
        terms_accepted: bool,
    ) -> Result<Account, RegisterError> {
        if name.is_empty() || email.is_empty() || password.is_empty() || confirm_password.is_empty()
        {
            return Err(RegisterError::MissingFields);
        }
        if !terms_accepted {
            return Err(RegisterError::TermsNotAccepted);
        }
        if password != confirm_password {
            return Err(RegisterError::PasswordMismatch);
        }
        if self.accounts.iter().any(|account| account.email == email) {
            return Err(RegisterError::EmailTaken);
        }

        let account = Account {
            id: self.next_id(),
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            created_at: Utc::now(),
        };
        self.accounts.push(account.clone());
        self.persist(USERS_KEY, &self.accounts);

        // Registration auto-authenticates.
        self.session = Some(account.clone());
        self.persist(SESSION_KEY, &self.session);

        debug!("registered account {} ({})", account.id, account.email);
        Ok(account)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<Account, LoginError> {
        let account = self
            .accounts
            .iter()
            .find(|account| account.email == email && account.password == password)
            .cloned()
            .ok_or(LoginError::InvalidCredentials)?;
        self.session = Some(account.clone());
        self.persist(SESSION_KEY, &self.session);
        debug!("session bound to account {}", account.id);
        Ok(account)
    }

    /// Idempotent: logging out with no active session is a no-op.
    pub fn logout(&mut self) {
        self.session = None;
        if let Err(err) = self.kv.remove(SESSION_KEY) {
            warn!("could not clear persisted session: {}", err);
        }
    }

    pub fn current_session(&self) -> Option<&Account> {
        self.session.as_ref()
    }

    pub fn add_to_watchlist(&mut self, title: &str) -> Result<(), WatchlistError> {
        if self.session.is_none() {
            return Err(WatchlistError::NotAuthenticated);
        }
        if self.watchlist.iter().any(|entry| entry == title) {
            return Err(WatchlistError::AlreadyPresent);
        }
        self.watchlist.push(title.to_owned());
        self.persist(WATCHLIST_KEY, &self.watchlist);
        Ok(())
    }

    /// Removing a title that is not on the list is a no-op, not an error.
    pub fn remove_from_watchlist(&mut self, title: &str) {
        self.watchlist.retain(|entry| entry != title);
        self.persist(WATCHLIST_KEY, &self.watchlist);
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    pub fn watchlist_count(&self) -> usize {
        self.watchlist.len()
    }

    /// There is no independent "watched" tracking; half the list, rounded
    /// down, counts as watched.
    pub fn watched_count(&self) -> usize {
        self.watchlist.len() / 2
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Irreversible. Callers are expected to confirm with the user first.
    pub fn reset_all(&mut self) {
        self.accounts.clear();
        self.session = None;
        self.watchlist.clear();
        for key in &[USERS_KEY, SESSION_KEY, WATCHLIST_KEY] {
            if let Err(err) = self.kv.remove(key) {
                warn!("could not clear {:?}: {}", key, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemStore(Rc<RefCell<HashMap<String, String>>>);

    impl KvStore for MemStore {
        fn load(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key).cloned()
        }

        fn save(&self, key: &str, value: &str) -> Result<(), PersistError> {
            self.0.borrow_mut().insert(key.to_owned(), value.to_owned());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), PersistError> {
            self.0.borrow_mut().remove(key);
            Ok(())
        }
    }

    /// A store whose writes always fail, for degraded-persistence tests.
    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn load(&self, _key: &str) -> Option<String> {
            None
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), PersistError> {
            Err(PersistError::Unavailable("disk full".to_owned()))
        }

        fn remove(&self, _key: &str) -> Result<(), PersistError> {
            Err(PersistError::Unavailable("disk full".to_owned()))
        }
    }

    fn store() -> AccountStore<MemStore> {
        AccountStore::open(MemStore::default())
    }

    #[test]
    fn register_distinct_emails_grows_collection() {
        let mut store = store();
        for i in 0..5 {
            let email = format!("user{}@x.com", i);
            store
                .register("User", &email, "pw", "pw", true)
                .unwrap();
        }
        assert_eq!(store.account_count(), 5);
    }

    #[test]
    fn register_validation_order() {
        let mut store = store();
        assert_eq!(
            store.register("", "a@x.com", "pw", "pw", true),
            Err(RegisterError::MissingFields)
        );
        // Missing fields win over unaccepted terms
        assert_eq!(
            store.register("Ann", "a@x.com", "pw", "", false),
            Err(RegisterError::MissingFields)
        );
        assert_eq!(
            store.register("Ann", "a@x.com", "pw", "pw", false),
            Err(RegisterError::TermsNotAccepted)
        );
        assert_eq!(
            store.register("Ann", "a@x.com", "pw", "other", true),
            Err(RegisterError::PasswordMismatch)
        );
        assert_eq!(store.account_count(), 0);
    }

    #[test]
    fn duplicate_email_is_rejected_and_leaves_collection_unchanged() {
        let mut store = store();
        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        assert_eq!(
            store.register("Other", "ann@x.com", "pw2", "pw2", true),
            Err(RegisterError::EmailTaken)
        );
        assert_eq!(store.account_count(), 1);
        // Email comparison is case-sensitive, so this is a different key
        store.register("Ann", "ANN@x.com", "pw", "pw", true).unwrap();
        assert_eq!(store.account_count(), 2);
    }

    #[test]
    fn register_assigns_unique_ids() {
        let mut store = store();
        let a = store.register("A", "a@x.com", "pw", "pw", true).unwrap();
        let b = store.register("B", "b@x.com", "pw", "pw", true).unwrap();
        let c = store.register("C", "c@x.com", "pw", "pw", true).unwrap();
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn register_auto_authenticates() {
        let mut store = store();
        let account = store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        assert_eq!(store.current_session(), Some(&account));
    }

    #[test]
    fn login_requires_exact_credentials_with_single_error_kind() {
        let mut store = store();
        store.register("Ann", "ann@x.com", "pw1", "pw1", true).unwrap();
        store.logout();

        // Wrong password and unknown email are indistinguishable
        assert_eq!(
            store.login("ann@x.com", "wrong"),
            Err(LoginError::InvalidCredentials)
        );
        assert_eq!(
            store.login("nobody@x.com", "pw1"),
            Err(LoginError::InvalidCredentials)
        );
        assert!(store.current_session().is_none());

        let account = store.login("ann@x.com", "pw1").unwrap();
        assert_eq!(account.email, "ann@x.com");
        assert_eq!(store.current_session(), Some(&account));
    }

    #[test]
    fn logout_is_idempotent() {
        let mut store = store();
        store.logout();
        assert!(store.current_session().is_none());

        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.logout();
        assert!(store.current_session().is_none());
        store.logout();
        assert!(store.current_session().is_none());
    }

    #[test]
    fn watchlist_requires_session() {
        let mut store = store();
        assert_eq!(
            store.add_to_watchlist("Cosmic Journey"),
            Err(WatchlistError::NotAuthenticated)
        );
    }

    #[test]
    fn watchlist_rejects_duplicates() {
        let mut store = store();
        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.add_to_watchlist("Cosmic Journey").unwrap();
        assert_eq!(
            store.add_to_watchlist("Cosmic Journey"),
            Err(WatchlistError::AlreadyPresent)
        );
        assert_eq!(store.watchlist_count(), 1);
    }

    #[test]
    fn removing_absent_title_is_a_noop() {
        let mut store = store();
        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.add_to_watchlist("Drama Queen").unwrap();
        store.remove_from_watchlist("Cosmic Journey");
        assert_eq!(store.watchlist(), ["Drama Queen".to_owned()]);
        store.remove_from_watchlist("Drama Queen");
        assert_eq!(store.watchlist_count(), 0);
    }

    #[test]
    fn watchlist_preserves_insertion_order() {
        let mut store = store();
        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.add_to_watchlist("Drama Queen").unwrap();
        store.add_to_watchlist("Cosmic Journey").unwrap();
        store.add_to_watchlist("Love in Paris").unwrap();
        store.remove_from_watchlist("Cosmic Journey");
        assert_eq!(
            store.watchlist(),
            ["Drama Queen".to_owned(), "Love in Paris".to_owned()]
        );
    }

    #[test]
    fn watched_count_is_half_the_watchlist_rounded_down() {
        let mut store = store();
        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        let expected: [usize; 5] = [0, 0, 1, 1, 2];
        assert_eq!(store.watched_count(), expected[0]);
        for (i, want) in expected.iter().enumerate().skip(1) {
            store.add_to_watchlist(&format!("Movie {}", i)).unwrap();
            assert_eq!(store.watchlist_count(), i);
            assert_eq!(store.watched_count(), *want);
        }
    }

    #[test]
    fn state_survives_reopen() {
        let kv = MemStore::default();
        let mut store = AccountStore::open(kv.clone());
        let account = store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.add_to_watchlist("Cosmic Journey").unwrap();
        drop(store);

        let reopened = AccountStore::open(kv);
        assert_eq!(reopened.account_count(), 1);
        assert_eq!(reopened.current_session(), Some(&account));
        assert_eq!(reopened.watchlist(), ["Cosmic Journey".to_owned()]);
    }

    #[test]
    fn state_survives_reopen_on_sled() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let mut store = AccountStore::open(db.clone());
        let account = store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.add_to_watchlist("Cosmic Journey").unwrap();
        store.logout();
        drop(store);

        let mut reopened = AccountStore::open(db);
        assert!(reopened.current_session().is_none());
        assert_eq!(reopened.login("ann@x.com", "pw").unwrap(), account);
        assert_eq!(reopened.watchlist(), ["Cosmic Journey".to_owned()]);
    }

    #[test]
    fn malformed_entries_hydrate_as_empty() {
        let kv = MemStore::default();
        kv.save(USERS_KEY, "{not json").unwrap();
        kv.save(SESSION_KEY, "42").unwrap();
        kv.save(WATCHLIST_KEY, "[\"ok\"]").unwrap();
        let store = AccountStore::open(kv);
        assert_eq!(store.account_count(), 0);
        assert!(store.current_session().is_none());
        // The well-formed entry still loads
        assert_eq!(store.watchlist(), ["ok".to_owned()]);
    }

    #[test]
    fn operations_keep_working_when_persistence_is_down() {
        let mut store = AccountStore::open(BrokenStore);
        let account = store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        assert_eq!(store.current_session(), Some(&account));
        store.add_to_watchlist("Cosmic Journey").unwrap();
        assert_eq!(store.watchlist_count(), 1);
        store.logout();
        assert!(store.current_session().is_none());
    }

    #[test]
    fn reset_all_clears_everything() {
        let kv = MemStore::default();
        let mut store = AccountStore::open(kv.clone());
        store.register("Ann", "ann@x.com", "pw", "pw", true).unwrap();
        store.add_to_watchlist("Cosmic Journey").unwrap();
        store.reset_all();
        assert_eq!(store.account_count(), 0);
        assert!(store.current_session().is_none());
        assert_eq!(store.watchlist_count(), 0);
        assert!(kv.load(USERS_KEY).is_none());
        assert!(kv.load(SESSION_KEY).is_none());
        assert!(kv.load(WATCHLIST_KEY).is_none());
    }

    #[test]
    fn register_watchlist_logout_login_scenario() {
        let mut store = store();
        let ann = store
            .register("Ann", "ann@x.com", "pw1", "pw1", true)
            .unwrap();
        assert_eq!(store.current_session(), Some(&ann));

        store.add_to_watchlist("Cosmic Journey").unwrap();
        store.logout();

        assert_eq!(
            store.login("ann@x.com", "wrong"),
            Err(LoginError::InvalidCredentials)
        );
        let back = store.login("ann@x.com", "pw1").unwrap();
        assert_eq!(back, ann);
        assert_eq!(store.watchlist(), ["Cosmic Journey".to_owned()]);
    }
}
