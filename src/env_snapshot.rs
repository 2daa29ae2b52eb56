//! Host environment capture.
//!
//! The snapshot is taken once per invocation and passed by value from then on;
//! nothing downstream reads the process environment again.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Keys that are host-specific and must never reach the image.
pub const RESERVED_KEYS: [&str; 2] = ["PATH", "HOME"];

/// Ordered, key-unique host environment minus the reserved keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

fn representable_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| c == '=' || c.is_whitespace() || c.is_control() || c == '"')
}

fn representable_value(value: &str) -> bool {
    crate::reject_newlines(value, "value").is_ok()
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let utf8 = pairs.into_iter().filter_map(|(k, v)| {
            match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (k, _) => {
                    tracing::debug!(key = ?k, "skipping non UTF-8 environment entry");
                    None
                }
            }
        });
        Self::from_pairs(utf8)
    }

    /// Build a snapshot from arbitrary pairs, applying the exclusion rules.
    /// Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut snap = EnvSnapshot::default();
        for (k, v) in pairs {
            snap.insert(k.into(), v.into());
        }
        snap
    }

    fn insert(&mut self, key: String, value: String) {
        if is_reserved_key(&key) {
            return;
        }
        if !representable_key(&key) || !representable_value(&value) {
            tracing::debug!(key = %key, "skipping environment entry that cannot be expressed as a directive");
            return;
        }
        self.vars.insert(key, value);
    }

    /// Overlay extra pairs (e.g. manifest `env`), still subject to exclusion.
    pub fn with_overrides<'a, I>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (k, v) in extra {
            self.insert(k.clone(), v.clone());
        }
        self
    }

    /// Drop additional keys by exact name.
    pub fn without<'a, I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        for k in keys {
            self.vars.remove(k);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
