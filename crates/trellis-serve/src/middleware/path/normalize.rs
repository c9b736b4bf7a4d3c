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

//! Middleware for request path normalization.

use std::path::Path;

use crate::handler::Handler;
use crate::http::response::ResponseExt;
use crate::http::{Request, Response, Status, Uri};
use crate::middleware::Middleware;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Trailing slash behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrailingSlash {
    /// Append trailing slash.
    Append,
    /// Remove trailing slash.
    Remove,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for request path normalization.
///
/// This middleware redirects requests whose path doesn't match the configured
/// trailing slash behavior. Redirects point to the full reference, i.e., they
/// include any mount point stripped by [`BasePath`][], as well as the query.
///
/// [`BasePath`]: crate::middleware::BasePath
///
/// # Examples
///
/// ```
/// use trellis_serve::handler::NotFound;
/// use trellis_serve::http::{Header, Request, Status};
/// use trellis_serve::middleware::{Middleware, NormalizePath};
///
/// // Create middleware
/// let middleware = NormalizePath::default();
///
/// // Handle request with middleware
/// let res = middleware.process(Request::new().uri("/coffee?q=1"), &NotFound);
/// assert_eq!(res.status, Status::Found);
/// assert_eq!(res.headers.get(Header::Location), Some("/coffee/?q=1"));
/// ```
#[derive(Clone, Debug)]
pub struct NormalizePath {
    /// Trailing slash behavior.
    slash: TrailingSlash,
    /// Redirect status.
    status: Status,
    /// Whether paths with file extensions are left alone.
    skip_files: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl NormalizePath {
    /// Creates a middleware for request path normalization.
    #[must_use]
    pub fn new(slash: TrailingSlash) -> Self {
        Self { slash, status: Status::Found, skip_files: true }
    }

    /// Sets the status used for redirects.
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Sets whether paths with file extensions are left alone.
    #[must_use]
    pub fn skip_files(mut self, skip_files: bool) -> Self {
        self.skip_files = skip_files;
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for NormalizePath {
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        let path = req.uri.path.as_str();
        if path == "/" && req.reference() == "/" {
            return next.handle(req);
        }

        // Paths with extensions most likely point to files
        if self.skip_files && Path::new(path).extension().is_some() {
            return next.handle(req);
        }

        // Redirect if the path doesn't match the desired behavior
        let mut reference = req.reference();
        match (self.slash, reference.ends_with('/')) {
            (TrailingSlash::Append, false) => reference.push('/'),
            (TrailingSlash::Remove, true) => {
                reference.pop();
            }
            _ => return next.handle(req),
        }
        let uri = Uri::from_parts(reference, req.uri.query);
        Response::redirect(self.status, uri)
    }
}

impl Default for NormalizePath {
    /// Creates a middleware appending trailing slashes with "302 Found".
    fn default() -> Self {
        Self::new(TrailingSlash::Append)
    }
}
