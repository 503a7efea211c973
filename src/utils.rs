//! Utility functions.
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::hash::Hash;

/// Inserts a key-value pair into a HashMap if the key does not already exist.
///
/// If the key already exists, it returns an error with a message indicating the key's existence.
pub fn try_insert<K, V>(map: &mut HashMap<K, V>, key: K, value: V) -> Result<()>
where
    K: Eq + Hash + std::fmt::Display,
{
    match map.entry(key) {
        Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
        Occupied(entry) => Err(anyhow!("Key {} already exists in the map", entry.key())),
    }
}

/// Check that an iterator of values is sorted and unique
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}

/// Division that yields 0 for a zero denominator.
///
/// Per-vehicle and per-mile averages are legitimately degenerate for records with no population
/// or no activity, so those divisions recover to 0 rather than failing.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_insert() {
        let mut map = HashMap::new();
        assert!(try_insert(&mut map, "key", 1).is_ok());
        assert_eq!(
            try_insert(&mut map, "key", 2).unwrap_err().to_string(),
            "Key key already exists in the map"
        );
        assert_eq!(map["key"], 1);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(10.0, 4.0), 2.5);
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_is_sorted_and_unique() {
        assert!(is_sorted_and_unique::<u32>(&[]));
        assert!(is_sorted_and_unique(&[1]));
        assert!(is_sorted_and_unique(&[1, 2, 4]));
        assert!(!is_sorted_and_unique(&[1, 1]));
        assert!(!is_sorted_and_unique(&[2, 1]));
    }
}
