// src/llm/cache.rs
//
// Response cache keyed by prompt hash. Judge and preference replies are
// reused across regeneration rounds.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct ResponseCache {
    map: Mutex<HashMap<String, String>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.map.lock() {
            Ok(m) => m.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    pub fn insert(&self, key: String, text: String) {
        match self.map.lock() {
            Ok(mut m) => {
                m.insert(key, text);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key, text);
            }
        }
    }

    /// Return the cached text for `key`, or compute, store and return it.
    /// Failures are not cached.
    pub fn get_or_try_insert(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<String, String>,
    ) -> Result<String, String> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }

        let text = compute()?;
        self.insert(key.to_string(), text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn second_lookup_hits() {
        let cache = ResponseCache::new();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let out = cache.get_or_try_insert("k", || {
                calls.set(calls.get() + 1);
                Ok("8".into())
            });
            assert_eq!(out, Ok("8".to_string()));
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.get("k").as_deref(), Some("8"));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = ResponseCache::new();
        assert!(cache.get_or_try_insert("k", || Err("down".into())).is_err());
        assert_eq!(cache.get("k"), None);

        assert_eq!(cache.get_or_try_insert("k", || Ok("ok".into())), Ok("ok".to_string()));
    }
}
