// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Ordered map.

use serde::de::{Error, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::marker::PhantomData;
use std::slice::Iter;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Ordered map.
///
/// Several parts of the configuration depend on declaration order, e.g., the
/// route table, where order breaks ties between equally specific routes, or
/// media type rules, where the first matching pattern wins. This map keeps
/// entries in the order they were read. Later duplicates replace earlier
/// entries in place, and errors reading a value are prefixed with its key.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::config::Ordered;
///
/// // Read map, keeping declaration order
/// let map: Ordered<u32> = serde_json::from_str(r#"{"b": 1, "a": 2}"#)?;
/// assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "a"]);
/// assert_eq!(map.get("a"), Some(&2));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ordered<V> {
    /// Entries in declaration order.
    entries: Vec<(String, V)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<V> Ordered<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Inserts a value, replacing an existing value with the same key.
    pub fn insert<K>(&mut self, key: K, value: V)
    where
        K: Into<String>,
    {
        let key = key.into();
        match self.entries.iter_mut().find(|(prior, _)| *prior == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value for the given key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find_map(|(prior, value)| (prior == key).then_some(value))
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Returns an iterator over all entries.
    #[inline]
    pub fn iter(&self) -> Iter<'_, (String, V)> {
        self.entries.iter()
    }
}

#[allow(clippy::must_use_candidate)]
impl<V> Ordered<V> {
    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are any entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<V> Default for Ordered<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Ordered<V>
where
    K: Into<String>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a, V> IntoIterator for &'a Ordered<V> {
    type Item = &'a (String, V);
    type IntoIter = Iter<'a, (String, V)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de, V> Deserialize<'de> for Ordered<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(OrderedVisitor { marker: PhantomData })
    }
}

// ----------------------------------------------------------------------------

/// Visitor reading map entries in order.
struct OrderedVisitor<V> {
    marker: PhantomData<V>,
}

impl<'de, V> Visitor<'de> for OrderedVisitor<V>
where
    V: Deserialize<'de>,
{
    type Value = Ordered<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Ordered::new();
        while let Some(key) = access.next_key::<String>()? {
            let value = access
                .next_value::<V>()
                .map_err(|err| A::Error::custom(format!("{key}: {err}")))?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
