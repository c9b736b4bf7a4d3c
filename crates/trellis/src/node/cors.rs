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

//! Cross-origin resource sharing node.

use serde::Deserialize;

use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Header, Request, Response};
use trellis_serve::middleware::Middleware;

use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::settings::MaxAge;
use crate::Result;

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Cross-origin resource sharing node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CorsNode {
    /// Allowed origin.
    #[serde(default)]
    pub allow_origin: Option<String>,
    /// Allowed methods.
    #[serde(default)]
    pub allow_methods: Vec<String>,
    /// Allowed headers.
    #[serde(default)]
    pub allow_headers: Vec<String>,
    /// Maximum age of preflight results.
    #[serde(default)]
    pub max_age: MaxAge,
    /// Next node.
    pub next: Descriptor,
}

/// Middleware adding cross-origin resource sharing headers.
#[derive(Clone, Debug, Default)]
pub struct Cors {
    /// Header values.
    headers: Vec<(Header, String)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl CorsNode {
    /// Creates the middleware adding the configured headers.
    fn middleware(&self) -> Cors {
        let mut headers = Vec::new();
        if let Some(origin) = &self.allow_origin {
            headers.push((Header::AccessControlAllowOrigin, origin.clone()));
        }
        if !self.allow_methods.is_empty() {
            let methods = self.allow_methods.join(", ");
            headers.push((Header::AccessControlAllowMethods, methods));
        }
        if !self.allow_headers.is_empty() {
            let names = self.allow_headers.join(", ");
            headers.push((Header::AccessControlAllowHeaders, names));
        }
        if self.max_age.0 > 0 {
            let seconds = self.max_age.0.to_string();
            headers.push((Header::AccessControlMaxAge, seconds));
        }
        Cors { headers }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for CorsNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        let next = ctx.resolve_handler(&self.next, uri)?;
        Ok(Resolved::handler(Layer::new(self.middleware(), next)))
    }

    fn name(&self) -> &str {
        "cors"
    }
}

impl Middleware for Cors {
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        let mut res = next.handle(req);
        for (header, value) in &self.headers {
            res.headers.insert(*header, value);
        }
        res
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::http::ResponseExt;

    use super::*;

    fn node(config: serde_json::Value) -> CorsNode {
        serde_json::from_value(config).unwrap()
    }

    #[test]
    fn adds_configured_headers() {
        let cors = node(serde_json::json!({
            "allowOrigin": "*",
            "allowMethods": ["GET", "POST"],
            "allowHeaders": ["Content-Type"],
            "maxAge": "farFuture",
            "next": "!200"
        }))
        .middleware();
        let next = |_: Request| Response::from_text("ok");
        let res = cors.process(Request::new(), &next);
        let get = |header| res.headers.get(header);
        assert_eq!(get(Header::AccessControlAllowOrigin), Some("*"));
        assert_eq!(get(Header::AccessControlAllowMethods), Some("GET, POST"));
        assert_eq!(get(Header::AccessControlAllowHeaders), Some("Content-Type"));
        assert_eq!(get(Header::AccessControlMaxAge), Some("315360000"));
    }

    #[test]
    fn omits_unconfigured_headers() {
        let cors = node(serde_json::json!({ "next": "!200" })).middleware();
        let next = |_: Request| Response::from_text("ok");
        let res = cors.process(Request::new(), &next);
        assert!(!res.headers.contains(Header::AccessControlAllowOrigin));
        assert!(!res.headers.contains(Header::AccessControlMaxAge));
    }
}
