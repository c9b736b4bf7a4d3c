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

//! Application configuration.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::descriptor::Descriptor;
use super::settings::Settings;
use super::Result;

mod dispatchers;
mod ordered;

pub use dispatchers::{Dispatcher, Dispatchers};
pub use ordered::Ordered;

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Route table, mapping URI templates to descriptors in declaration order.
pub type Routes = Ordered<Descriptor>;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Application configuration.
///
/// This is the configuration surface an application is assembled from. The
/// route table is the root of the descriptor tree, and is always compiled
/// into a router with the default routing mode.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::config::AppConfig;
///
/// // Create configuration from string
/// let config: AppConfig = r#"{
///     "routes": {
///         "/*": ["manual", "static"],
///         "/about/": "/about/info/!"
///     },
///     "errors": { "404": "/errors/missing/!" }
/// }"#.parse()?;
/// assert_eq!(config.routes.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct AppConfig {
    /// Application settings.
    pub settings: Settings,
    /// Virtual hosts, mapped to the base URI the application is attached at.
    pub hosts: Ordered<String>,
    /// Route table.
    pub routes: Routes,
    /// Error pages, mapping status codes to capture URIs.
    pub errors: BTreeMap<u16, String>,
    /// Dispatch table.
    pub dispatchers: Dispatchers,
    /// URIs requested internally after the application started.
    pub preheat: Vec<String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Creates a configuration from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid configuration.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Into::into)
    }

    /// Creates a configuration by loading and parsing the file at given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, or is not a valid
    /// configuration.
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let content = fs::read_to_string(path)?;
        content.parse()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for AppConfig {
    type Err = super::Error;

    /// Creates a configuration from a JSON string.
    fn from_str(value: &str) -> Result<Self> {
        serde_json::from_str(value).map_err(Into::into)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_route_order() -> Result {
        let config: AppConfig = r#"{
            "routes": { "/z/": "static", "/a/": "manual", "/m/": "!404" }
        }"#
        .parse()?;
        let uris: Vec<_> = config.routes.keys().collect();
        assert_eq!(uris, ["/z/", "/a/", "/m/"]);
        Ok(())
    }

    #[test]
    fn reads_error_pages_and_hosts() -> Result {
        let config: AppConfig = r#"{
            "hosts": { "default": "/blog/", "internal": "/blog/" },
            "errors": { "404": "/errors/404/!", "500": "/errors/500/" },
            "preheat": ["/", "/about/"]
        }"#
        .parse()?;
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.errors.get(&404).map(String::as_str), Some("/errors/404/!"));
        assert_eq!(config.preheat.len(), 2);
        Ok(())
    }

    #[test]
    fn rejects_unknown_node_types() {
        let result: Result<AppConfig> =
            r#"{ "routes": { "/": "coffee" } }"#.parse();
        assert!(result.is_err());
    }
}
