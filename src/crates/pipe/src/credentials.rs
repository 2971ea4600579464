//! Round-robin API key selection.

use crate::error::{PipeError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotates through the configured API keys.
///
/// The key list is re-split from the settings string on every call; only the
/// cursor is kept. The cursor is never reset, so keys are visited in order
/// `0, 1, .., k-1, 0, ..` for as long as the list does not change.
///
/// Concurrent turns each get a distinct cursor value, but the order in which
/// they observe those values is not tied to the order their requests go out.
#[derive(Debug, Default)]
pub struct CredentialRotator {
    cursor: AtomicUsize,
}

impl CredentialRotator {
    /// Create a rotator starting at the first key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next key from a comma-separated list.
    ///
    /// Fails with [`PipeError::NoCredentials`] when the list has no non-blank
    /// entries; the cursor is not advanced in that case.
    pub fn next_credential(&self, api_keys: &str) -> Result<String> {
        let keys = split_keys(api_keys);
        if keys.is_empty() {
            return Err(PipeError::NoCredentials);
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(keys[index % keys.len()].to_string())
    }

    /// Number of keys handed out so far.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

/// Split a comma-separated key list into trimmed, non-empty keys.
pub fn split_keys(api_keys: &str) -> Vec<&str> {
    api_keys
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_keys_trims_and_drops_blanks() {
        assert_eq!(split_keys(" a , b,, ,c "), vec!["a", "b", "c"]);
        assert!(split_keys("").is_empty());
        assert!(split_keys(" , ,").is_empty());
    }

    #[test]
    fn test_rotation_order() {
        let rotator = CredentialRotator::new();
        let picks: Vec<String> = (0..5)
            .map(|_| rotator.next_credential("k1,k2,k3").unwrap())
            .collect();
        assert_eq!(picks, vec!["k1", "k2", "k3", "k1", "k2"]);
        assert_eq!(rotator.cursor(), 5);
    }

    #[test]
    fn test_single_key_always_returned() {
        let rotator = CredentialRotator::new();
        for _ in 0..3 {
            assert_eq!(rotator.next_credential("only").unwrap(), "only");
        }
    }

    #[test]
    fn test_empty_list_is_config_error() {
        let rotator = CredentialRotator::new();
        let err = rotator.next_credential(" , ").unwrap_err();
        assert!(matches!(err, PipeError::NoCredentials));
        assert_eq!(rotator.cursor(), 0);
    }

    #[test]
    fn test_list_is_resplit_each_call() {
        let rotator = CredentialRotator::new();
        assert_eq!(rotator.next_credential("a,b").unwrap(), "a");
        // Cursor is 1; a longer list is indexed with the same cursor.
        assert_eq!(rotator.next_credential("x,y,z").unwrap(), "y");
    }

    proptest! {
        #[test]
        fn prop_round_robin_is_fair(k in 1usize..8, n in 0usize..64) {
            let keys: Vec<String> = (0..k).map(|i| format!("key{}", i)).collect();
            let joined = keys.join(",");
            let rotator = CredentialRotator::new();

            let mut counts = vec![0usize; k];
            for call in 0..n {
                let key = rotator.next_credential(&joined).unwrap();
                let index = keys.iter().position(|candidate| *candidate == key).unwrap();
                prop_assert_eq!(index, call % k);
                counts[index] += 1;
            }

            for count in counts {
                prop_assert!(count == n / k || count == n / k + 1);
            }
        }
    }
}
