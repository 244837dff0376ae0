use std::collections::HashMap;
use std::hash::Hash;

/// A lookup table with an explicit fallback.
///
/// Used wherever behaviour is selected by a key: the array type picks its
/// report builder, and the `Type` column of a Celerra `server_export` row
/// picks how the row is reshaped. Keys without an entry resolve to the
/// default, so a lookup never fails.
#[derive(Debug, Clone)]
pub struct Dispatch<K, V> {
    entries: HashMap<K, V>,
    default: V,
}

impl<K: Eq + Hash, V> Dispatch<K, V> {
    pub fn new(default: V) -> Self {
        Self {
            entries: HashMap::new(),
            default,
        }
    }

    /// Registers `value` under `key`, replacing any earlier entry.
    pub fn with(mut self, key: K, value: V) -> Self {
        self.entries.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// The entry for `key`, or the default.
    pub fn get<Q>(&self, key: &Q) -> &V
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key).unwrap_or(&self.default)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_key_and_default() {
        let table = Dispatch::new("multiprotocol")
            .with("export".to_string(), "nfs")
            .with("share".to_string(), "smb");

        assert_eq!(*table.get("export"), "nfs");
        assert_eq!(*table.get("share"), "smb");
        assert_eq!(*table.get("anything"), "multiprotocol");
        assert!(table.contains("share"));
        assert!(!table.contains("anything"));
    }

    #[test]
    fn test_insert_replaces() {
        let mut table = Dispatch::new(0);
        assert_eq!(table.insert(1, 10), None);
        assert_eq!(table.insert(1, 11), Some(10));
        assert_eq!(*table.get(&1), 11);
        assert_eq!(*table.get(&2), 0);
    }
}
