//! In-memory keyring.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{ClientResult, Keyring};

/// A fixed name to address table.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyring {
    keys: HashMap<String, String>,
}

impl StaticKeyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key.
    #[must_use]
    pub fn with_key(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.insert(name, address);
        self
    }

    /// Add or replace a key.
    pub fn insert(&mut self, name: impl Into<String>, address: impl Into<String>) {
        self.keys.insert(name.into(), address.into());
    }

    /// Look a key up without going through the async trait.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the keyring is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticKeyring {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { keys: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

#[async_trait]
impl Keyring for StaticKeyring {
    async fn address(&self, name: &str) -> ClientResult<Option<String>> {
        Ok(self.keys.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_keyring_lookup() {
        let keyring = StaticKeyring::new().with_key("alice", "kira1alice");

        assert_eq!(keyring.address("alice").await.unwrap().as_deref(), Some("kira1alice"));
        assert_eq!(keyring.address("bob").await.unwrap(), None);
    }

    #[test]
    fn test_from_iterator() {
        let keyring: StaticKeyring = [("a", "kira1a"), ("b", "kira1b")].into_iter().collect();
        assert_eq!(keyring.len(), 2);
        assert_eq!(keyring.get("b"), Some("kira1b"));
    }
}
