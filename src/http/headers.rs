//! HTTP header map with case-insensitive name lookup.
//!
//! Field names compare case-insensitively per RFC 9110 §5.1; insertion order
//! is preserved so responses serialize deterministically.

use std::fmt;

/// Well-known header names used across the gateway.
pub mod names {
    pub const CACHE_CONTROL: &str = "Cache-Control";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const ETAG: &str = "ETag";
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    pub const ORIGIN: &str = "Origin";
    pub const VARY: &str = "Vary";
}

/// A case-insensitive, order-preserving HTTP header map.
///
/// [`insert`](Self::insert) appends (multi-value fields such as `Vary`),
/// [`set`](Self::set) replaces every existing entry with the same name
/// (single-value fields such as `ETag`).
///
/// # Examples
///
/// ```
/// use ledger_gateway::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Cache-Control", "no-store");
/// headers.set("cache-control", "public, max-age=60");
///
/// assert_eq!(headers.get("CACHE-CONTROL"), Some("public, max-age=60"));
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry, keeping any earlier values for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Replaces all entries named `name` with a single entry.
    ///
    /// The new entry takes the position of the first replaced one, or is
    /// appended when the name was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self
            .inner
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(pos) => {
                self.inner[pos] = (name.clone(), value);
                let mut idx = 0;
                self.inner.retain(|(k, _)| {
                    let keep = idx <= pos || !k.eq_ignore_ascii_case(&name);
                    idx += 1;
                    keep
                });
            }
            None => self.inner.push((name, value)),
        }
    }

    /// Returns the first value for `name` (case-insensitive), or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes all entries named `name`. Returns `true` if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inner.len();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.inner.len() < before
    }

    /// Returns `true` if at least one entry is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Total number of entries (not unique names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.inner {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}
