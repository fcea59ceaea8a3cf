//! Resource tag diffing

use std::collections::BTreeMap;

/// Tag changes for one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Tags to create or overwrite
    pub upsert: BTreeMap<String, String>,
    /// Tag keys to drop
    pub remove: Vec<String>,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}

/// Compute the tag changes from `old` to `new`.
///
/// A key whose value changed is only upserted; it is never also removed.
pub fn diff_tags(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> TagDelta {
    let upsert = new
        .iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let remove = old
        .keys()
        .filter(|k| !new.contains_key(*k))
        .cloned()
        .collect();
    TagDelta { upsert, remove }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unchanged() {
        let t = tags(&[("team", "netcode"), ("env", "prod")]);
        assert!(diff_tags(&t, &t).is_empty());
    }

    #[test]
    fn test_changed_added_removed() {
        let old = tags(&[("team", "netcode"), ("env", "prod"), ("owner", "ops")]);
        let new = tags(&[("team", "netcode"), ("env", "staging"), ("cost", "42")]);

        let delta = diff_tags(&old, &new);
        assert_eq!(delta.upsert, tags(&[("env", "staging"), ("cost", "42")]));
        assert_eq!(delta.remove, vec!["owner".to_string()]);
    }

    #[test]
    fn test_clear_all() {
        let old = tags(&[("a", "1"), ("b", "2")]);
        let delta = diff_tags(&old, &BTreeMap::new());
        assert!(delta.upsert.is_empty());
        assert_eq!(delta.remove, vec!["a".to_string(), "b".to_string()]);
    }
}
