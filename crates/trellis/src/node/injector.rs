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

//! Injector node.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Request, Response};
use trellis_serve::middleware::Middleware;

use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::Result;

use super::{attributes, Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Injector node, writing preset values to request attributes.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InjectorNode {
    /// Values written to request attributes.
    #[serde(default)]
    pub locals: BTreeMap<String, Value>,
    /// Next node.
    pub next: Descriptor,
}

/// Middleware writing preset values to request attributes.
#[derive(Clone, Debug)]
pub struct Injector {
    /// Values written to request attributes.
    locals: Vec<(String, String)>,
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for InjectorNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        let next = ctx.resolve_handler(&self.next, uri)?;
        let injector = Injector { locals: attributes(&self.locals) };
        Ok(Resolved::handler(Layer::new(injector, next)))
    }

    fn name(&self) -> &str {
        "injector"
    }
}

impl Middleware for Injector {
    fn process(&self, mut req: Request, next: &dyn Handler) -> Response {
        req.attributes.extend(self.locals.iter().cloned());
        next.handle(req)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::http::ResponseExt;

    use super::*;

    #[test]
    fn writes_locals_before_forwarding() {
        let node: InjectorNode = serde_json::from_value(serde_json::json!({
            "locals": { "greeting": "hello", "count": 3 },
            "next": "!200"
        }))
        .unwrap();
        let mut ctx = Context::new("app", ".");
        let handler = node.create(&mut ctx, "/").unwrap().into_handler();
        assert_eq!(handler.handle(Request::new()).status.code(), 200);

        // Check values seen by next handler
        let injector = Injector { locals: attributes(&node.locals) };
        let next = |req: Request| {
            let greeting = req.attributes.get("greeting").unwrap_or_default();
            let count = req.attributes.get("count").unwrap_or_default();
            Response::from_text(format!("{greeting} {count}"))
        };
        let res = injector.process(Request::new(), &next);
        assert_eq!(res.body, b"hello 3");
    }
}
