//! Set difference between recorded and desired collections
//!
//! Used wherever a remote API exposes "add these / remove these" calls for an
//! unordered collection (port permissions, tag keys, ...).

use std::collections::BTreeSet;

/// Elements to add and remove to turn one set into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// Present in the new set only
    pub added: Vec<T>,

    /// Present in the old set only
    pub removed: Vec<T>,
}

impl<T: Ord + Clone> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Apply the diff to `old`: removals first, then additions
    pub fn apply_to<'a>(&self, old: impl IntoIterator<Item = &'a T>) -> BTreeSet<T>
    where
        T: 'a,
    {
        let mut result: BTreeSet<T> = old.into_iter().cloned().collect();
        for item in &self.removed {
            result.remove(item);
        }
        for item in &self.added {
            result.insert(item.clone());
        }
        result
    }
}

/// Compute `new \ old` and `old \ new`.
///
/// Elements are compared by full structural equality; duplicates on either
/// side collapse. Output is sorted so plans render deterministically.
pub fn diff_sets<'a, T>(
    old: impl IntoIterator<Item = &'a T>,
    new: impl IntoIterator<Item = &'a T>,
) -> SetDiff<T>
where
    T: Ord + Clone + 'a,
{
    let old: BTreeSet<&T> = old.into_iter().collect();
    let new: BTreeSet<&T> = new.into_iter().collect();

    SetDiff {
        added: new.difference(&old).map(|t| (*t).clone()).collect(),
        removed: old.difference(&new).map(|t| (*t).clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sets_produce_nothing() {
        let old = vec![1, 2, 3];
        let diff = diff_sets(&old, &old);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_added_and_removed() {
        let old = vec!["a", "b", "c"];
        let new = vec!["b", "c", "d"];
        let diff = diff_sets(&old, &new);
        assert_eq!(diff.added, vec!["d"]);
        assert_eq!(diff.removed, vec!["a"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let old = vec![1, 1, 2];
        let new = vec![2, 3, 3];
        let diff = diff_sets(&old, &new);
        assert_eq!(diff.added, vec![3]);
        assert_eq!(diff.removed, vec![1]);
    }

    #[test]
    fn test_apply_reaches_new_set() {
        let old = vec![5, 1, 9];
        let new = vec![9, 2];
        let diff = diff_sets(&old, &new);
        let applied = diff.apply_to(&old);
        assert_eq!(applied, new.iter().cloned().collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_empty_sides() {
        let empty: Vec<u8> = Vec::new();
        let some = vec![1u8, 2];

        let diff = diff_sets(&empty, &some);
        assert_eq!(diff.added, vec![1, 2]);
        assert!(diff.removed.is_empty());

        let diff = diff_sets(&some, &empty);
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, vec![1, 2]);
    }
}
