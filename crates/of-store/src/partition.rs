//! Disjoint named buckets.
//!
//! A property name sits in at most one bucket at a time. Bucket order is the
//! key order of `C`; names keep their insertion order within a bucket.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Partition<C: Ord> {
    buckets: BTreeMap<C, Vec<String>>,
}

impl<C: Ord> Default for Partition<C> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<C: Ord + Copy> Partition<C> {
    /// Build from server lists. A name listed under several buckets stays in
    /// the first one (in key order); later duplicates are dropped.
    pub fn from_lists(lists: &BTreeMap<C, Vec<String>>) -> Self {
        let mut partition = Self::default();
        for (&bucket, names) in lists {
            partition.buckets.entry(bucket).or_default();
            for name in names {
                if partition.bucket_of(name).is_none() {
                    partition.buckets.entry(bucket).or_default().push(name.clone());
                }
            }
        }
        partition
    }

    pub fn bucket_of(&self, name: &str) -> Option<C> {
        self.buckets
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(bucket, _)| *bucket)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bucket_of(name).is_some()
    }

    /// Place `name` in `bucket`, removing it from wherever it was. Moving to
    /// the bucket it already occupies changes nothing.
    pub fn move_to(&mut self, name: &str, bucket: C) {
        if self.bucket_of(name) == Some(bucket) {
            return;
        }
        self.remove(name);
        self.buckets.entry(bucket).or_default().push(name.to_string());
    }

    /// Take `name` out of its bucket; returns where it was.
    pub fn remove(&mut self, name: &str) -> Option<C> {
        let bucket = self.bucket_of(name)?;
        if let Some(names) = self.buckets.get_mut(&bucket) {
            names.retain(|n| n != name);
        }
        Some(bucket)
    }

    pub fn names(&self, bucket: C) -> &[String] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (C, &[String])> {
        self.buckets.iter().map(|(c, names)| (*c, names.as_slice()))
    }

    pub fn all_names(&self) -> impl Iterator<Item = &String> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_lists(&self) -> BTreeMap<C, Vec<String>> {
        self.buckets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use of_core::PropertyType;

    fn lists() -> BTreeMap<PropertyType, Vec<String>> {
        BTreeMap::from([
            (PropertyType::Numerical, vec!["temp".to_string(), "speed".to_string()]),
            (PropertyType::Categorical, vec!["grade".to_string()]),
        ])
    }

    #[test]
    fn move_leaves_single_bucket() {
        let mut p = Partition::from_lists(&lists());
        p.move_to("temp", PropertyType::Categorical);
        assert_eq!(p.bucket_of("temp"), Some(PropertyType::Categorical));
        assert_eq!(p.names(PropertyType::Numerical), ["speed"]);
        assert_eq!(p.names(PropertyType::Categorical), ["grade", "temp"]);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn duplicates_keep_first_bucket() {
        let mut raw = lists();
        raw.insert(PropertyType::Text, vec!["temp".to_string()]);
        let p = Partition::from_lists(&raw);
        assert_eq!(p.bucket_of("temp"), Some(PropertyType::Numerical));
        assert!(p.names(PropertyType::Text).is_empty());
    }

    #[test]
    fn remove_reports_origin() {
        let mut p = Partition::from_lists(&lists());
        assert_eq!(p.remove("grade"), Some(PropertyType::Categorical));
        assert_eq!(p.remove("grade"), None);
        assert!(!p.contains("grade"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use of_core::Role;
    use proptest::prelude::*;

    fn role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn name() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string)
    }

    proptest! {
        #[test]
        fn moves_keep_a_set_partition(ops in prop::collection::vec((name(), prop::option::of(role())), 0..40)) {
            let mut p: Partition<Role> = Partition::default();
            for (n, dest) in &ops {
                match dest {
                    Some(r) => p.move_to(n, *r),
                    None => { p.remove(n); }
                }
            }
            let mut seen: Vec<&String> = p.all_names().collect();
            let total = seen.len();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), total);
            prop_assert_eq!(p.len(), total);
        }

        #[test]
        fn repeated_move_is_idempotent(n in name(), r in role(), seed in prop::collection::vec((name(), role()), 0..10)) {
            let mut p: Partition<Role> = Partition::default();
            for (other, bucket) in &seed {
                p.move_to(other, *bucket);
            }
            p.move_to(&n, r);
            let once = p.clone();
            p.move_to(&n, r);
            prop_assert_eq!(p, once);
        }
    }
}
