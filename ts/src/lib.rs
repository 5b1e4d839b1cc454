//! TaskStore - namespaced key-value persistence
//!
//! Stores JSON documents under string keys in a single SQLite file. Keys are
//! namespaced per identity (`{key}:{identity}`), mirroring a browser-style
//! local key-value store, so one database can hold state for several
//! identities without collisions.
//!
//! # Example
//!
//! ```ignore
//! use taskstore::{Store, namespaced_key};
//!
//! let mut store = Store::open("/tmp/todone")?;
//! let key = namespaced_key("todone:tasks", "default");
//! store.put_json(&key, &vec!["a", "b"])?;
//! let tasks: Option<Vec<String>> = store.get_json(&key)?;
//! ```

mod store;

pub use store::{DB_FILE_NAME, Store};

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Build a namespaced storage key: `{key}:{identity}`
pub fn namespaced_key(key: &str, identity: &str) -> String {
    format!("{}:{}", key, identity)
}
