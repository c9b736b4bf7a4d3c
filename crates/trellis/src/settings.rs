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

//! Application settings.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use trellis_serve::http::MediaTypes;

pub mod units;

pub use units::{ByteSize, Interval, MaxAge};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Application settings.
///
/// All sections and fields are optional and fall back to sensible defaults,
/// so an empty object is a valid settings object.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Settings {
    /// Description.
    pub description: Description,
    /// Code settings.
    pub code: Code,
    /// Upload settings.
    pub uploads: Uploads,
    /// Compression settings.
    pub compression: Compression,
    /// Media type overrides by extension.
    pub media_types: HashMap<String, String, ahash::RandomState>,
    /// Logger name.
    pub logger: Option<String>,
}

/// Description.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Description {
    /// Display name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Author.
    pub author: Option<String>,
    /// Owner.
    pub owner: Option<String>,
}

/// Code settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Code {
    /// Library directories.
    pub libraries: Vec<PathBuf>,
    /// Minimum time between checks whether source files changed.
    pub minimum_time_between_validity_checks: Interval,
    /// Document name used for directory requests.
    pub default_document_name: String,
    /// Extension assumed for documents.
    pub default_extension: String,
    /// Language tag assumed for documents.
    pub default_language_tag: String,
}

/// Upload settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Uploads {
    /// Directory for uploads exceeding the threshold.
    pub root: PathBuf,
    /// Size above which uploads are written to disk.
    pub size_threshold: ByteSize,
}

/// Compression settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Compression {
    /// Size above which responses are compressed.
    pub size_threshold: ByteSize,
    /// Media type patterns never compressed.
    pub exclude: Vec<String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Settings {
    /// Returns the interval between checks whether source files changed.
    #[inline]
    #[must_use]
    pub fn validity(&self) -> Duration {
        self.code.minimum_time_between_validity_checks.0
    }

    /// Returns the media type table, extended with the overrides.
    #[must_use]
    pub fn media_types(&self) -> MediaTypes {
        let mut types = MediaTypes::default();
        types.extend(self.media_types.iter());
        types
    }

    /// Returns the library directories, resolved against the given root.
    #[must_use]
    pub fn libraries(&self, root: &Path) -> Vec<PathBuf> {
        self.code.libraries.iter().map(|path| root.join(path)).collect()
    }

    /// Returns the logger name, falling back to the given application name.
    #[must_use]
    pub fn logger<'a>(&'a self, name: &'a str) -> &'a str {
        self.logger.as_deref().unwrap_or(name)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Code {
    fn default() -> Self {
        Self {
            libraries: vec![PathBuf::from("libraries")],
            minimum_time_between_validity_checks: Interval(
                Duration::from_secs(1),
            ),
            default_document_name: String::from("default"),
            default_extension: String::from("js"),
            default_language_tag: String::from("javascript"),
        }
    }
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            size_threshold: ByteSize(0),
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            size_threshold: ByteSize(1024),
            exclude: Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults() -> serde_json::Result<()> {
        let settings: Settings = serde_json::from_str("{}")?;
        assert_eq!(settings.validity(), Duration::from_secs(1));
        assert_eq!(settings.code.default_extension, "js");
        assert_eq!(settings.compression.size_threshold, ByteSize(1024));
        assert_eq!(settings.logger("blog"), "blog");
        Ok(())
    }

    #[test]
    fn reads_sections() -> serde_json::Result<()> {
        let settings: Settings = serde_json::from_str(
            r#"{
                "code": { "minimumTimeBetweenValidityChecks": "30s" },
                "uploads": { "sizeThreshold": "4kb" },
                "mediaTypes": { "md": "text/markdown" },
                "logger": "web"
            }"#,
        )?;
        assert_eq!(settings.validity(), Duration::from_secs(30));
        assert_eq!(settings.uploads.size_threshold, ByteSize(4096));
        assert_eq!(settings.media_types().get("md"), Some("text/markdown"));
        assert_eq!(settings.logger("blog"), "web");
        Ok(())
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = serde_json::from_str::<Settings>(r#"{"codes": {}}"#);
        assert!(result.is_err());
    }
}
