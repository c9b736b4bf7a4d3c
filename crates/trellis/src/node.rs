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

//! Nodes.
//!
//! Nodes are the building blocks of the handler tree of an application. Each
//! node type is resolved into a handler, resolving the descriptors it wraps
//! before wrapping them, so that every handler in the tree is live when its
//! parent is created.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use trellis_serve::handler::{Handler, NotFound};

use super::context::Context;
use super::Result;

pub mod assets;
pub mod auth;
pub mod cache_control;
pub mod capture;
pub mod chain;
pub mod cors;
pub mod dispatch;
pub mod files;
pub mod filter;
pub mod injector;
pub mod manual;
pub mod redirect;
pub mod resource;
pub mod router;
pub mod status;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Outcome of resolving a node.
#[derive(Clone)]
pub enum Resolved {
    /// Handler.
    Handler(Arc<dyn Handler>),
    /// Hidden route.
    Hidden,
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Node.
///
/// Nodes are created with the application context and the URI of their
/// position in the handler tree, which is used for error reporting. Besides
/// the node types of the catalogue, nodes can be implemented in code and
/// passed to the router as pre-built descriptors.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::context::Context;
/// use trellis::node::{Node, Resolved};
/// use trellis_serve::handler::Handler;
/// use trellis_serve::http::{Request, Response, ResponseExt, Status};
///
/// // Create node from closure
/// let node = |_: &mut Context, _: &str| -> trellis::Result<Resolved> {
///     Ok(Resolved::handler(|_: Request| Response::from_text("Hello")))
/// };
///
/// // Create handler and handle request
/// let mut ctx = Context::new("app", ".");
/// let handler = node.create(&mut ctx, "/")?.into_handler();
/// assert_eq!(handler.handle(Request::new()).status, Status::Ok);
/// # Ok(())
/// # }
/// ```
pub trait Node: Send + Sync + 'static {
    /// Creates the handler of the node at the given URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is misconfigured.
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved>;

    /// Returns the name of the node, used when logging routes.
    fn name(&self) -> &str {
        "node"
    }
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Resolved {
    /// Creates an outcome from a handler.
    pub fn handler<H>(handler: H) -> Self
    where
        H: Handler,
    {
        Resolved::Handler(Arc::new(handler))
    }

    /// Returns the handler, or a handler answering with "404 Not Found" if
    /// the route is hidden.
    #[must_use]
    pub fn into_handler(self) -> Arc<dyn Handler> {
        match self {
            Resolved::Handler(handler) => handler,
            Resolved::Hidden => Arc::new(NotFound),
        }
    }
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F> Node for F
where
    F: Fn(&mut Context, &str) -> Result<Resolved> + Send + Sync + 'static,
{
    #[inline]
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        self(ctx, uri)
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Converts configured values into request attributes.
pub(crate) fn attributes(
    values: &BTreeMap<String, Value>,
) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(value) => value.clone(),
                value => value.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}
