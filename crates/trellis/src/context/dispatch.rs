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

//! Dispatch table.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::config::{Dispatcher, Dispatchers};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Dispatcher name used when none is configured as default.
pub const DEFAULT_DISPATCHER: &str = "javascript";

/// Library URI of dispatch targets used when none is configured.
const DEFAULT_RESOURCES: &str = "/resources/";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Dispatch target.
///
/// The URI of the dispatcher document below the internal mount point of the
/// manual resource is only known after the whole handler tree is built, so
/// it's shared between the target and all dispatch handlers using it.
#[derive(Clone, Debug)]
pub struct Target {
    /// Dispatcher name.
    pub name: String,
    /// Library document implementing the dispatcher.
    pub dispatcher: String,
    /// Library URI of dispatch targets.
    pub resources: String,
    /// Capture URI, bound when the application is assembled.
    pub uri: Arc<OnceLock<String>>,
}

/// Dispatch table.
///
/// The table holds all configured dispatchers, and lazily adds the ones that
/// are referenced by dispatch nodes without being configured. Only those
/// referenced are wired to the manual resource.
#[derive(Debug, Default)]
pub struct DispatchTable {
    /// Default dispatcher name.
    default: Option<String>,
    /// Targets with configuration, and whether they're referenced.
    entries: Vec<(Target, Dispatcher, bool)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl DispatchTable {
    /// Creates a dispatch table from the given configuration.
    #[must_use]
    pub fn new(config: &Dispatchers) -> Self {
        let entries = config
            .entries
            .iter()
            .map(|(name, dispatcher)| {
                (target(name, dispatcher), dispatcher.clone(), false)
            })
            .collect();
        Self { default: config.default.clone(), entries }
    }

    /// Returns the name of the default dispatcher.
    #[must_use]
    pub fn default_name(&self) -> &str {
        self.default.as_deref().unwrap_or(DEFAULT_DISPATCHER)
    }

    /// Returns the target for the given dispatcher, or the default one, and
    /// marks it as referenced.
    pub fn reference(&mut self, name: Option<&str>) -> Target {
        let name = name.unwrap_or(self.default_name()).to_string();
        let index = match self.position(&name) {
            Some(index) => index,
            None => {
                let dispatcher = Dispatcher::default();
                let target = target(&name, &dispatcher);
                self.entries.push((target, dispatcher, false));
                self.entries.len() - 1
            }
        };
        let (target, _, referenced) = &mut self.entries[index];
        *referenced = true;
        target.clone()
    }

    /// Returns the target for the given dispatcher, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.position(name).map(|index| &self.entries[index].0)
    }

    /// Returns an iterator over all targets.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.entries.iter().map(|(target, _, _)| target)
    }

    /// Returns an iterator over the targets referenced by dispatch nodes.
    pub fn referenced(&self) -> impl Iterator<Item = &Target> {
        self.entries
            .iter()
            .filter(|(_, _, referenced)| *referenced)
            .map(|(target, _, _)| target)
    }

    /// Returns the additional values of all dispatchers, by global name.
    #[must_use]
    pub fn globals(&self) -> BTreeMap<String, Value> {
        let mut globals = BTreeMap::new();
        for (target, dispatcher, _) in &self.entries {
            for (key, value) in &dispatcher.extra {
                let name = format!("dispatcher.{}.{key}", target.name);
                globals.insert(name, value.clone());
            }
        }
        globals
    }

    /// Returns the position of the given dispatcher.
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(target, _, _)| target.name == name)
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates a target from a dispatcher configuration, applying defaults.
fn target(name: &str, dispatcher: &Dispatcher) -> Target {
    Target {
        name: name.to_string(),
        dispatcher: dispatcher
            .dispatcher
            .clone()
            .unwrap_or_else(|| format!("/dispatchers/{name}/")),
        resources: dispatcher
            .resources
            .clone()
            .unwrap_or_else(|| String::from(DEFAULT_RESOURCES)),
        uri: Arc::default(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DispatchTable {
        let config: Dispatchers = serde_json::from_str(
            r#"{
                "default": "python",
                "python": { "resources": "/py/", "strict": true },
                "ruby": "/rb/"
            }"#,
        )
        .unwrap();
        DispatchTable::new(&config)
    }

    #[test]
    fn applies_defaults_to_targets() {
        let mut table = table();
        let target = table.reference(None);
        assert_eq!(target.name, "python");
        assert_eq!(target.dispatcher, "/dispatchers/python/");
        assert_eq!(target.resources, "/py/");
        assert_eq!(table.get("ruby").unwrap().resources, "/rb/");
    }

    #[test]
    fn adds_unconfigured_targets_lazily() {
        let mut table = DispatchTable::default();
        assert_eq!(table.iter().count(), 0);
        let target = table.reference(None);
        assert_eq!(target.name, DEFAULT_DISPATCHER);
        assert_eq!(target.resources, DEFAULT_RESOURCES);
        let target = table.reference(Some("lua"));
        assert_eq!(target.dispatcher, "/dispatchers/lua/");
        assert_eq!(table.referenced().count(), 2);
    }

    #[test]
    fn tracks_references() {
        let mut table = table();
        assert_eq!(table.referenced().count(), 0);
        let _ = table.reference(Some("ruby"));
        let names: Vec<_> =
            table.referenced().map(|target| target.name.as_str()).collect();
        assert_eq!(names, ["ruby"]);
    }

    #[test]
    fn exposes_extra_values_as_globals() {
        let globals = table().globals();
        assert_eq!(
            globals.get("dispatcher.python.strict"),
            Some(&Value::Bool(true))
        );
        assert_eq!(globals.len(), 1);
    }
}
