use std::borrow::Borrow;
use std::sync::Arc;

use crate::value::{Dict, Value};

type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// A shared, concurrently mutable key-value bag.
///
/// Clones share the same underlying map: an asset handed out by a container
/// and the container's own copy observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    map: Arc<dashmap::DashMap<Arc<str>, Value, Hasher>>,
}

impl Metadata {
    #[inline(always)]
    pub fn new() -> Self {
        Metadata::default()
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.map.get(key).map(|v| v.clone())
    }

    pub fn insert_raw<K, V>(&self, key: K, value: V) -> Option<Value>
        where K: Into<Arc<str>> + Borrow<str>, V: Into<Value>
    {
        let mut value = value.into();
        if let Some(mut existing) = self.map.get_mut(key.borrow()) {
            std::mem::swap(&mut *existing, &mut value);
            Some(value)
        } else {
            self.map.insert(key.into(), value)
        }
    }

    pub fn remove_raw<K: Borrow<str>>(&self, key: K) -> Option<Value> {
        self.map.remove(key.borrow()).map(|(_, v)| v)
    }

    /// Replaces every entry with those in `dict`.
    pub fn replace_all(&self, dict: &Dict) {
        self.map.clear();
        for (k, v) in dict {
            self.insert_raw(k.clone(), v.clone());
        }
    }

    /// A point-in-time copy of every entry, ordered by key.
    pub fn to_dict(&self) -> Dict {
        let mut dict: Dict = self.map.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        dict.sort_keys();
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn clones_share_writes() {
        let a = Metadata::new();
        let b = a.clone();
        a.insert_raw("title", "hello");
        assert_eq!(b.get_raw("title"), Some(Value::from("hello")));
        assert_eq!(b.insert_raw("title", "bye"), Some(Value::from("hello")));
        assert_eq!(a.remove_raw("title"), Some(Value::from("bye")));
        assert_eq!(b.get_raw("title"), None);
    }

    #[test]
    fn snapshots_are_ordered_by_key() {
        let meta = Metadata::new();
        meta.replace_all(&dict! { "zeta" => 1, "alpha" => 2, "mid" => 3 });

        let keys: Vec<_> = meta.to_dict().keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);

        meta.replace_all(&dict! { "only" => true });
        assert_eq!(meta.to_dict(), dict! { "only" => true });
    }
}
