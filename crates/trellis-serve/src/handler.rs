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

//! Handler.

use std::fmt;

use super::http::response::ResponseExt;
use super::http::{Request, Response, Status};

mod error;
mod layer;
pub mod matcher;

pub use error::{Error, Result};
pub use layer::Layer;
pub use matcher::Matcher;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Handler.
///
/// Handlers represent the executable form of a request processing pipeline.
/// Unlike middlewares, which define composable layers of request processing,
/// handlers package those layers into a single unit of execution, always
/// returning a [`Response`] for every given [`Request`].
///
/// Handlers are shared between all threads serving requests, which is why
/// they must be [`Send`] and [`Sync`]. A handler that can't serve a request
/// answers with "404 Not Found", which callers trying alternatives interpret
/// as "not applicable", while "5xx" responses signal errors.
pub trait Handler: Send + Sync + 'static {
    /// Handles the given request.
    ///
    /// This method is invoked with a request and is required to return a
    /// response. It must be infallible and should not panic.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::handler::Handler;
    /// use trellis_serve::http::{Request, Response, ResponseExt, Status};
    ///
    /// // Define handler
    /// struct Coffee;
    ///
    /// // Create handler implementation
    /// impl Handler for Coffee {
    ///     fn handle(&self, req: Request) -> Response {
    ///         if req.uri.path == "/coffee/" {
    ///             Response::from_status(Status::ImATeapot)
    ///         } else {
    ///             Response::from_status(Status::NotFound)
    ///         }
    ///     }
    /// }
    ///
    /// // Handle request with handler
    /// let res = Coffee.handle(Request::new().uri("/coffee/"));
    /// assert_eq!(res.status, Status::ImATeapot);
    /// ```
    fn handle(&self, req: Request) -> Response;
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Fallback handler.
///
/// This handler always returns "404 Not Found", and is the natural final
/// handler for middlewares used on their own, e.g., in tests.
pub struct NotFound;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for NotFound {
    /// Handles the given request.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::handler::{Handler, NotFound};
    /// use trellis_serve::http::{Request, Status};
    ///
    /// // Handle request with handler
    /// let res = NotFound.handle(Request::new());
    /// assert_eq!(res.status, Status::NotFound);
    /// ```
    #[inline]
    fn handle(&self, _req: Request) -> Response {
        Response::from_status(Status::NotFound)
    }
}

// ----------------------------------------------------------------------------

impl fmt::Debug for Box<dyn Handler> {
    /// Formats the handler for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Box<dyn Handler>")
    }
}
// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F, R> Handler for F
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: Into<Response>,
{
    #[inline]
    fn handle(&self, req: Request) -> Response {
        self(req).into()
    }
}
