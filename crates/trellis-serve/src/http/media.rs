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

//! Media types.

use std::collections::HashMap;
use std::path::Path;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Media type for content that could not be negotiated.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Built-in extension table.
const DEFAULTS: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("gif", "image/gif"),
    ("htm", "text/html; charset=utf-8"),
    ("html", "text/html; charset=utf-8"),
    ("ico", "image/x-icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("less", "text/css"),
    ("map", "application/json"),
    ("mp4", "video/mp4"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain; charset=utf-8"),
    ("wasm", "application/wasm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Extension to media type table.
///
/// The table starts out with a set of common web formats, which applications
/// can extend or override with their own mappings.
///
/// # Examples
///
/// ```
/// use trellis_serve::http::MediaTypes;
///
/// // Create table and add mapping
/// let mut types = MediaTypes::default();
/// types.insert("md", "text/markdown");
/// assert_eq!(types.get("md"), Some("text/markdown"));
/// assert_eq!(types.for_path("app.CSS"), "text/css");
/// ```
#[derive(Clone, Debug)]
pub struct MediaTypes {
    /// Media types by lowercase extension.
    inner: HashMap<String, String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl MediaTypes {
    /// Creates an empty table without built-in mappings.
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: HashMap::new() }
    }

    /// Adds or replaces the mapping for the given extension.
    pub fn insert<E, T>(&mut self, ext: E, media_type: T)
    where
        E: AsRef<str>,
        T: Into<String>,
    {
        let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
        self.inner.insert(ext, media_type.into());
    }

    /// Returns the media type for the given extension.
    #[must_use]
    pub fn get(&self, ext: &str) -> Option<&str> {
        self.inner
            .get(&ext.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the media type for the given path, falling back to
    /// [`OCTET_STREAM`] for unknown or missing extensions.
    #[must_use]
    pub fn for_path<P>(&self, path: P) -> &str
    where
        P: AsRef<Path>,
    {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.get(ext))
            .unwrap_or(OCTET_STREAM)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for MediaTypes {
    /// Creates a table with built-in mappings.
    fn default() -> Self {
        let iter = DEFAULTS.iter().map(|&(ext, media_type)| {
            (ext.to_string(), media_type.to_string())
        });
        Self { inner: iter.collect() }
    }
}

impl<E, T> Extend<(E, T)> for MediaTypes
where
    E: AsRef<str>,
    T: Into<String>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (E, T)>,
    {
        for (ext, media_type) in iter {
            self.insert(ext, media_type);
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns the essence of a media type, i.e., without parameters.
///
/// # Examples
///
/// ```
/// use trellis_serve::http::media::essence;
///
/// assert_eq!(essence("text/html; charset=utf-8"), "text/html");
/// ```
#[must_use]
pub fn essence(media_type: &str) -> &str {
    media_type
        .split_once(';')
        .map_or(media_type, |(essence, _)| essence)
        .trim()
}

/// Returns whether the media type matches the given pattern.
///
/// Patterns may use a wildcard subtype, e.g. `image/*`, or `*/*` to match
/// any media type. Parameters are ignored on both sides.
///
/// # Examples
///
/// ```
/// use trellis_serve::http::media::matches;
///
/// assert!(matches("image/*", "image/png"));
/// assert!(matches("text/css", "text/css; charset=utf-8"));
/// assert!(!matches("text/*", "application/javascript"));
/// ```
#[must_use]
pub fn matches(pattern: &str, media_type: &str) -> bool {
    let pattern = essence(pattern);
    let media_type = essence(media_type);
    if pattern == "*/*" || pattern == "*" {
        return true;
    }

    // Compare main type and subtype separately to support wildcards
    match (pattern.split_once('/'), media_type.split_once('/')) {
        (Some((kind, "*")), Some((other, _))) => {
            kind.eq_ignore_ascii_case(other)
        }
        _ => pattern.eq_ignore_ascii_case(media_type),
    }
}
