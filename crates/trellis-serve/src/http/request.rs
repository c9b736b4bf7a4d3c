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

//! HTTP request.

use std::fmt;

use super::header::{Header, Headers};
use super::method::Method;

mod attributes;
mod uri;

pub use attributes::{Attributes, BASE};
pub use uri::Uri;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP request.
///
/// Besides the usual HTTP components, a request carries [`Attributes`], which
/// are request-scoped values that handlers can write for handlers further
/// down the pipeline, e.g., variables extracted from a matched route, or the
/// originally requested URI of a request that was redirected internally.
///
/// Requests own all of their data, so they can be cloned and handed to one
/// handler after another when trying alternatives.
///
/// # Examples
///
/// ```
/// use trellis_serve::http::{Header, Method, Request};
///
/// // Create request
/// let req = Request::new()
///     .method(Method::Get)
///     .uri("/coffee/?kind=arabica")
///     .header(Header::Host, "localhost")
///     .attribute("kind", "arabica");
/// assert_eq!(req.uri.path, "/coffee/");
/// assert_eq!(req.uri.query.as_deref(), Some("kind=arabica"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: Headers,
    /// Request-scoped attributes.
    pub attributes: Attributes,
    /// Request body.
    pub body: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Request {
    /// Creates a request.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the full reference path of the request.
    ///
    /// When a mount point was stripped from the path by [`BasePath`][] or a
    /// prefix route, the stripped part is recorded in the [`BASE`] attribute.
    /// This method joins both, yielding the path as originally requested.
    ///
    /// [`BasePath`]: crate::middleware::BasePath
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::request::BASE;
    /// use trellis_serve::http::Request;
    ///
    /// // Create request with base
    /// let req = Request::new()
    ///     .uri("/app.css")
    ///     .attribute(BASE, "/static");
    /// assert_eq!(req.reference(), "/static/app.css");
    /// ```
    #[must_use]
    pub fn reference(&self) -> String {
        match self.attributes.get(BASE) {
            Some(base) if !base.is_empty() => {
                let base = base.trim_end_matches('/');
                format!("{base}{}", self.uri.path)
            }
            _ => self.uri.path.clone(),
        }
    }
}

impl Request {
    /// Sets the method of the request.
    #[inline]
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI of the request.
    #[inline]
    #[must_use]
    pub fn uri<U>(mut self, uri: U) -> Self
    where
        U: Into<Uri>,
    {
        self.uri = uri.into();
        self
    }

    /// Adds a header to the request.
    #[inline]
    #[must_use]
    pub fn header<V>(mut self, header: Header, value: V) -> Self
    where
        V: ToString,
    {
        self.headers.insert(header, value);
        self
    }

    /// Adds an attribute to the request.
    #[inline]
    #[must_use]
    pub fn attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.insert(key, value);
        self
    }

    /// Sets the body of the request.
    #[inline]
    #[must_use]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Display for Request {
    /// Formats the request for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} {} HTTP/1.1", self.method, self.uri)?;
        write!(f, "{}", self.headers)?;
        write!(f, "[Body: {} bytes]", self.body.len())
    }
}
