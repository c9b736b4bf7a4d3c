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

//! HTTP request URI.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet};
use std::fmt;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Characters to be percent-encoded in paths.
#[rustfmt::skip]
const PATH: &AsciiSet = &percent_encoding::CONTROLS
    .add(b' ').add(b'"').add(b'#').add(b'%').add(b'<').add(b'>').add(b'?')
    .add(b'`').add(b'{').add(b'}');

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP request URI.
///
/// The path is stored percent-decoded, as routing always happens on decoded
/// paths, while the query string is kept verbatim, since the engine never
/// interprets it and only ever passes it along, e.g., when redirecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uri {
    /// Request path, decoded.
    pub path: String,
    /// Query string, raw.
    pub query: Option<String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Uri {
    /// Creates a request URI from a path and query string.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::Uri;
    ///
    /// // Create request URI from parts
    /// let uri = Uri::from_parts("/path/", Some("key=value"));
    /// assert_eq!(uri.to_string(), "/path/?key=value");
    /// ```
    #[must_use]
    pub fn from_parts<P, Q>(path: P, query: Option<Q>) -> Self
    where
        P: Into<String>,
        Q: Into<String>,
    {
        Self {
            path: path.into(),
            query: query.map(Into::into).filter(|query| !query.is_empty()),
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<&str> for Uri {
    /// Creates a request URI from a string, decoding the path.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::Uri;
    ///
    /// // Create request URI from string
    /// let uri = Uri::from("/caf%C3%A9/?q=1");
    /// assert_eq!(uri.path, "/café/");
    /// assert_eq!(uri.query.as_deref(), Some("q=1"));
    /// ```
    fn from(value: &str) -> Self {
        let (path, query) = match value.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (value, None),
        };
        let path = percent_decode_str(path).decode_utf8_lossy();
        Self::from_parts(path.into_owned(), query)
    }
}

impl From<String> for Uri {
    #[inline]
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for Uri {
    #[inline]
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

// ----------------------------------------------------------------------------

impl Default for Uri {
    /// Creates a default request URI pointing to `/`.
    #[inline]
    fn default() -> Self {
        Self { path: String::from("/"), query: None }
    }
}

impl fmt::Display for Uri {
    /// Formats the request URI, encoding the path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", utf8_percent_encode(&self.path, PATH))?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}
