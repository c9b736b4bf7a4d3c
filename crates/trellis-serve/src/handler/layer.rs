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

//! Layer.

use std::sync::Arc;

use crate::http::{Request, Response};
use crate::middleware::Middleware;

use super::Handler;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Layer.
///
/// A layer binds a middleware to a shared next handler, turning it into a
/// handler itself. This is how decorating handlers are stacked on top of each
/// other when pipelines are assembled from configuration, where every handler
/// is built before the handler wrapping it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trellis_serve::handler::{Handler, Layer, NotFound};
/// use trellis_serve::http::{Header, Request, Response};
///
/// // Create layer adding a header to every response
/// let layer = Layer::new(
///     |req: Request, next: &dyn Handler| {
///         next.handle(req).header(Header::Vary, "Origin")
///     },
///     Arc::new(NotFound),
/// );
///
/// // Handle request with layer
/// let res = layer.handle(Request::new());
/// assert_eq!(res.headers.get(Header::Vary), Some("Origin"));
/// ```
pub struct Layer<M> {
    /// Middleware.
    middleware: M,
    /// Next handler.
    next: Arc<dyn Handler>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<M> Layer<M>
where
    M: Middleware,
{
    /// Creates a layer.
    pub fn new(middleware: M, next: Arc<dyn Handler>) -> Self {
        Self { middleware, next }
    }

    /// Returns a reference to the middleware.
    #[inline]
    pub fn middleware(&self) -> &M {
        &self.middleware
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<M> Handler for Layer<M>
where
    M: Middleware,
{
    #[inline]
    fn handle(&self, req: Request) -> Response {
        self.middleware.process(req, self.next.as_ref())
    }
}
