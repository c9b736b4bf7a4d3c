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

//! Middleware for stripping a mount point from request paths.

use crate::handler::matcher::{Matching, Route};
use crate::handler::{Handler, Result};
use crate::http::request::BASE;
use crate::http::{Request, Response};
use crate::middleware::Middleware;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for stripping a mount point from request paths.
///
/// Requests below the mount point are forwarded with the mount point removed
/// from the path, and appended to the [`BASE`] attribute, so handlers further
/// down see paths relative to the mount point, while still being able to
/// reconstruct the original reference. All other requests are forwarded
/// unchanged.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis_serve::handler::Handler;
/// use trellis_serve::http::{Request, Response, ResponseExt};
/// use trellis_serve::middleware::{BasePath, Middleware};
///
/// // Create middleware
/// let middleware = BasePath::new("/blog/")?;
///
/// // Handle request with middleware, echoing the path
/// let echo = |req: Request| Response::from_text(req.reference() + " " + &req.uri.path);
/// let res = middleware.process(Request::new().uri("/blog/a/"), &echo);
/// assert_eq!(res.body, b"/blog/a/ /a/");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BasePath {
    /// Mount point, without trailing slash.
    base: String,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl BasePath {
    /// Creates a middleware for stripping the given mount point.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount point is not a valid route.
    pub fn new<P>(path: P) -> Result<Self>
    where
        P: AsRef<str>,
    {
        let route = Route::new(path, Matching::StartsWith)
            .map_err(crate::handler::matcher::Error::from)?;
        let base = route.as_str().trim_end_matches('/').to_string();
        Ok(Self { base })
    }

    /// Returns the mount point, without trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for BasePath {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn process(&self, mut req: Request, next: &dyn Handler) -> Response {
        if self.base.is_empty() {
            return next.handle(req);
        }

        // Only strip the mount point on segment boundaries
        let Some(rest) = req.uri.path.strip_prefix(&self.base) else {
            return next.handle(req);
        };
        if !(rest.is_empty() || rest.starts_with('/')) {
            return next.handle(req);
        }

        // Forward request relative to the mount point
        let rest = if rest.is_empty() { "/" } else { rest };
        req.uri.path = rest.to_string();
        let base = match req.attributes.get(BASE) {
            Some(prior) => format!("{}{}", prior.trim_end_matches('/'), self.base),
            None => self.base.clone(),
        };
        req.attributes.insert(BASE, base);
        next.handle(req)
    }
}
