//! Ordered HTTP header storage.
//!
//! Headers keep their insertion order and allow repeated names, which is
//! what responses need for `Set-Cookie`. Lookups are case-insensitive.
//!
//! ```rust
//! use armature_core::headers::HeaderMap;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("Content-Type", "application/json");
//! headers.append("Set-Cookie", "a=1");
//! headers.append("Set-Cookie", "b=2");
//!
//! assert_eq!(headers.get("content-type").map(String::as_str), Some("application/json"));
//! assert_eq!(headers.get_all("set-cookie").len(), 2);
//! ```

use smallvec::SmallVec;
use std::fmt;

/// Number of headers stored inline before spilling to the heap.
pub const INLINE_HEADERS: usize = 12;

/// A header name-value pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn name_eq(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Insertion-ordered multimap of headers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: SmallVec<[Header; INLINE_HEADERS]>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|h| h.name_eq(name))
            .map(|h| &h.value)
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&String> {
        self.headers
            .iter()
            .filter(|h| h.name_eq(name))
            .map(|h| &h.value)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.name_eq(name))
    }

    /// Replace every value of `name` with a single value.
    ///
    /// The header keeps the position of its first occurrence. Returns the
    /// previous first value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self.headers.iter().position(|h| h.name_eq(&name)) {
            Some(index) => {
                let previous = std::mem::replace(&mut self.headers[index].value, value);
                let mut seen = 0usize;
                self.headers.retain(|h| {
                    if h.name_eq(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
                Some(previous)
            }
            None => {
                self.headers.push(Header::new(name, value));
                None
            }
        }
    }

    /// Add a value without touching existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push(Header::new(name, value));
    }

    /// Remove every value for `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !h.name_eq(name));
        before - self.headers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.headers.iter().map(|h| (&h.name, &h.value))
    }

    pub fn content_type(&self) -> Option<&String> {
        self.get("content-type")
    }

    pub fn authorization(&self) -> Option<&String> {
        self.get("authorization")
    }
}

impl fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.headers.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.append(name, value);
        }
        map
    }
}
