use crate::error::PersistError;
use log::warn;

pub const USERS_KEY: &str = "users";
pub const SESSION_KEY: &str = "currentUser";
pub const WATCHLIST_KEY: &str = "watchlist";

/// String-keyed durable storage. Each entry is a JSON document; the store
/// itself only sees opaque strings.
pub trait KvStore {
    /// Missing, unreadable, or non-UTF-8 entries all read as `None` so that
    /// callers can fall back to a default instead of failing hard.
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&self, key: &str) -> Result<(), PersistError>;
}

impl KvStore for sled::Db {
    fn load(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(Some(raw)) => match String::from_utf8(raw.to_vec()) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("discarding non-UTF-8 entry under {:?}: {}", key, err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("could not read {:?}: {}", key, err);
                None
            }
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.insert(key, value.as_bytes())?;
        // Persistence is synchronous: the write must be durable (or reported
        // as failed) before the triggering operation returns.
        self.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistError> {
        // Qualified call: `self.remove` would resolve to this trait method
        sled::Tree::remove(self, key)?;
        self.flush()?;
        Ok(())
    }
}
