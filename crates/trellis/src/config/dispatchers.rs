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

//! Dispatch table configuration.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::Ordered;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Key naming the default dispatcher.
const DEFAULT: &str = "default";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Dispatch table configuration.
///
/// Each entry maps a dispatcher name, conventionally a language tag, to the
/// library document implementing the dispatcher, and the library URI where
/// the dispatcher looks up dispatch identifiers. Entries are either given as
/// a string, which is the resources URI, or as an object. The special entry
/// `default` names the dispatcher used when a dispatch doesn't name one.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::config::Dispatchers;
///
/// // Read dispatch table
/// let dispatchers: Dispatchers = serde_json::from_str(r#"{
///     "default": "python",
///     "javascript": "/resources/js/",
///     "python": { "resources": "/resources/py/", "strict": true }
/// }"#)?;
/// assert_eq!(dispatchers.default.as_deref(), Some("python"));
/// assert_eq!(dispatchers.entries.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Dispatchers {
    /// Default dispatcher name.
    pub default: Option<String>,
    /// Dispatchers by name.
    pub entries: Ordered<Dispatcher>,
}

/// Dispatcher configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dispatcher {
    /// Library document implementing the dispatcher.
    pub dispatcher: Option<String>,
    /// Library URI of dispatch targets.
    pub resources: Option<String>,
    /// Additional values, exposed as application globals.
    pub extra: BTreeMap<String, Value>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Dispatcher {
    /// Creates a dispatcher configuration from a JSON value.
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(resources) => {
                Ok(Self { resources: Some(resources), ..Self::default() })
            }
            Value::Object(map) => Ok(Self::from_map(map)),
            value => Err(format!("invalid dispatcher: {value}")),
        }
    }

    /// Creates a dispatcher configuration from a JSON object.
    fn from_map(map: Map<String, Value>) -> Self {
        let mut dispatcher = Self::default();
        for (key, value) in map {
            match (key.as_str(), value) {
                ("dispatcher", Value::String(uri)) => {
                    dispatcher.dispatcher = Some(uri);
                }
                ("resources", Value::String(uri)) => {
                    dispatcher.resources = Some(uri);
                }
                (_, value) => {
                    dispatcher.extra.insert(key, value);
                }
            }
        }
        dispatcher
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<'de> Deserialize<'de> for Dispatchers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut dispatchers = Dispatchers::default();
        let entries = Ordered::<Value>::deserialize(deserializer)?;
        for (name, value) in &entries {
            match (name.as_str(), value) {
                (DEFAULT, Value::String(default)) => {
                    dispatchers.default = Some(default.clone());
                }
                (_, value) => {
                    let dispatcher = Dispatcher::from_value(value.clone())
                        .map_err(|err| D::Error::custom(format!("{name}: {err}")))?;
                    dispatchers.entries.insert(name.as_str(), dispatcher);
                }
            }
        }
        Ok(dispatchers)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_short_and_long_entries() -> serde_json::Result<()> {
        let dispatchers: Dispatchers = serde_json::from_str(
            r#"{
                "javascript": "/resources/",
                "lang": { "dispatcher": "/custom/lang/", "cache": 5 }
            }"#,
        )?;
        assert_eq!(dispatchers.default, None);
        let lang = dispatchers.entries.get("lang");
        assert_eq!(
            lang.and_then(|lang| lang.dispatcher.as_deref()),
            Some("/custom/lang/")
        );
        assert_eq!(
            lang.and_then(|lang| lang.extra.get("cache")),
            Some(&Value::from(5))
        );
        Ok(())
    }

    #[test]
    fn rejects_invalid_entries() {
        let result = serde_json::from_str::<Dispatchers>(r#"{"lang": 5}"#);
        assert!(result.is_err());
    }
}
