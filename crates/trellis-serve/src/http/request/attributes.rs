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

//! Request attributes.

use std::collections::btree_map::Iter;
use std::collections::BTreeMap;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Attribute holding the mount point stripped from the request path.
pub const BASE: &str = "trellis.base";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Request attributes.
///
/// Attributes are string values scoped to a single request. They are the only
/// channel through which handlers communicate along a pipeline, as handlers
/// themselves are shared between all requests and must not hold per-request
/// state.
///
/// # Examples
///
/// ```
/// use trellis_serve::http::Attributes;
///
/// // Create attributes and add value
/// let mut attributes = Attributes::new();
/// attributes.insert("id", "42");
/// assert_eq!(attributes.get("id"), Some("42"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    /// Ordered map of attributes.
    inner: BTreeMap<String, String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Attributes {
    /// Creates an attribute map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for the given key.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Returns whether the key is contained.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Updates the value for the given key.
    #[inline]
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.insert(key.into(), value.into());
    }

    /// Updates the value for the given key, unless it's already set.
    ///
    /// Returns whether the value was inserted.
    pub fn insert_if_absent<K, V>(&mut self, key: K, value: V) -> bool
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        if self.inner.contains_key(&key) {
            false
        } else {
            self.inner.insert(key, value.into());
            true
        }
    }

    /// Removes the value for the given key.
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.inner.remove(key)
    }

    /// Returns an iterator over all attributes.
    #[inline]
    pub fn iter(&self) -> Iter<'_, String, String> {
        self.inner.iter()
    }
}

#[allow(clippy::must_use_candidate)]
impl Attributes {
    /// Returns the number of attributes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any attributes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a String);
    type IntoIter = Iter<'a, String, String>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> Extend<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
