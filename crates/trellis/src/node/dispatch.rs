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

//! Dispatch node.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use trellis_serve::handler::Handler;
use trellis_serve::http::{Request, Response, ResponseExt, Status};

use crate::attribute::{DISPATCH_DISPATCHER, DISPATCH_ID, DISPATCH_RESOURCES};
use crate::context::{Context, Slot, Target};
use crate::template::Template;
use crate::Result;

use super::capture::forward;
use super::{attributes, Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Dispatch node, handing requests to the dispatcher of a language.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DispatchNode {
    /// Dispatch identifier template.
    pub id: String,
    /// Dispatcher name, defaulting to the default dispatcher.
    #[serde(default)]
    pub dispatcher: Option<String>,
    /// Values written to request attributes.
    #[serde(default)]
    pub locals: BTreeMap<String, Value>,
}

/// Dispatch.
///
/// Dispatches write the dispatch identifier, the dispatcher and the library
/// URI of dispatch targets to the request attributes, and capture the request
/// into the dispatcher document, which is served by the manual resource below
/// its internal URI. The dispatcher then resolves the identifier to the
/// implementation handling the request.
pub struct Dispatch {
    /// Dispatch identifier template.
    id: Template,
    /// Dispatch target.
    target: Target,
    /// Values written to request attributes.
    locals: Vec<(String, String)>,
    /// Root of the application.
    app: Slot,
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for DispatchNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        let target = ctx.dispatcher(self.dispatcher.as_deref());
        Ok(Resolved::handler(Dispatch {
            id: Template::new(&self.id),
            target,
            locals: attributes(&self.locals),
            app: ctx.app().clone(),
        }))
    }

    fn name(&self) -> &str {
        "dispatch"
    }
}

// ----------------------------------------------------------------------------

impl Handler for Dispatch {
    fn handle(&self, mut req: Request) -> Response {
        let Some(uri) = self.target.uri.get() else {
            return Response::from_status(Status::NotFound);
        };
        let id = self.id.expand(&req);
        req.attributes.insert(DISPATCH_ID, id);
        req.attributes.insert(DISPATCH_DISPATCHER, self.target.name.as_str());
        req.attributes
            .insert(DISPATCH_RESOURCES, self.target.resources.as_str());
        req.attributes.extend(self.locals.iter().cloned());
        forward(req, uri, true, &self.app)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;

    use crate::attribute::CAPTURED;

    use super::*;

    fn node(config: Value) -> DispatchNode {
        serde_json::from_value(config).unwrap()
    }

    #[test]
    fn injects_dispatch_attributes() {
        let mut ctx = Context::new("app", ".");
        let _ = ctx.manual(&Default::default()).unwrap();
        let handler = node(json!({ "id": "item", "dispatcher": "lang" }))
            .create(&mut ctx, "/a/{id}/")
            .unwrap()
            .into_handler();
        let _ = ctx.finish().unwrap();

        // Bind application root echoing the attributes
        let root: Arc<dyn Handler> = Arc::new(|req: Request| {
            let get = |key: &str| req.attributes.get(key).unwrap_or_default();
            Response::from_text(format!(
                "{}|{}|{}|{}|{}",
                req.uri.path,
                get(DISPATCH_ID),
                get(DISPATCH_DISPATCHER),
                get("id"),
                get(CAPTURED),
            ))
        });
        ctx.app().bind(root);
        let req = Request::new().uri("/a/42/").attribute("id", "42");
        assert_eq!(
            handler.handle(req).body,
            b"/_manual/dispatchers/lang/|item|lang|42|/a/42/"
        );
    }

    #[test]
    fn answers_not_found_without_manual() {
        let mut ctx = Context::new("app", ".");
        let handler = node(json!({ "id": "item" }))
            .create(&mut ctx, "/")
            .unwrap()
            .into_handler();
        let res = handler.handle(Request::new());
        assert_eq!(res.status, Status::NotFound);
    }
}
