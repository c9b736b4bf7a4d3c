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

//! Capture node.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use tracing::warn;
use trellis_serve::handler::Handler;
use trellis_serve::http::{Request, Response, ResponseExt, Status, Uri};

use crate::application::Applications;
use crate::attribute::{BASE, CAPTURED, HISTORY, ROOT};
use crate::context::{Context, Slot};
use crate::template::Template;
use crate::Result;

use super::{attributes, Node, Resolved};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Capture target.
enum Target {
    /// Root of the current application.
    Current(Slot),
    /// Another application, looked up by name.
    Other(String, Applications),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Capture node, redirecting requests internally.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CaptureNode {
    /// Target URI template, relative to the application root.
    pub uri: String,
    /// Application to capture into, instead of the current one.
    #[serde(default)]
    pub application: Option<String>,
    /// Whether to hide the target from requests from the outside.
    #[serde(default)]
    pub hidden: bool,
    /// Values written to request attributes.
    #[serde(default)]
    pub locals: BTreeMap<String, Value>,
}

/// Capture.
///
/// Captures forward the request to another URI of the same application, or
/// of another application of the same component, without the client taking
/// notice. The reference of the original request is recorded, so the target
/// can tell which URI was requested.
pub struct Capture {
    /// Target URI template.
    uri: Template,
    /// Whether to record the original reference.
    record: bool,
    /// Values written to request attributes.
    locals: Vec<(String, String)>,
    /// Target application.
    target: Target,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Capture {
    /// Creates a capture into the given application or the current one.
    #[must_use]
    pub fn new(ctx: &Context, uri: &str, application: Option<&str>) -> Self {
        let target = match application {
            Some(name) => {
                Target::Other(name.to_string(), ctx.applications().clone())
            }
            None => Target::Current(ctx.app().clone()),
        };
        Self {
            uri: Template::new(uri),
            record: true,
            locals: Vec::new(),
            target,
        }
    }

    /// Sets whether to record the original reference.
    #[must_use]
    pub fn record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Sets the values written to request attributes.
    #[must_use]
    pub fn locals(mut self, locals: Vec<(String, String)>) -> Self {
        self.locals = locals;
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for CaptureNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        let uri = self.uri.strip_suffix('!').unwrap_or(&self.uri);
        if self.hidden || uri.len() < self.uri.len() {
            ctx.hide(uri);
        }
        let capture = Capture::new(ctx, uri, self.application.as_deref())
            .locals(attributes(&self.locals));
        Ok(Resolved::handler(capture))
    }

    fn name(&self) -> &str {
        "capture"
    }
}

// ----------------------------------------------------------------------------

impl Handler for Capture {
    fn handle(&self, mut req: Request) -> Response {
        let uri = self.uri.expand(&req);
        req.attributes.extend(self.locals.iter().cloned());
        match &self.target {
            Target::Current(app) => forward(req, &uri, self.record, app),
            Target::Other(name, applications) => {
                let Some(app) = applications.get(name) else {
                    return Response::from_status(Status::NotFound);
                };
                req.attributes.remove(ROOT);
                forward(req, &uri, self.record, app.as_ref())
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Forwards the request to the given URI of the given target.
///
/// The original reference is recorded, if requested, unless an earlier
/// capture already recorded it. Every target is added to the capture history
/// of the request, and a target that is already part of the history denotes
/// a recursive redirection, which is answered with "500 Internal Server
/// Error". The query of the target URI takes precedence over the query of
/// the request.
pub fn forward(
    mut req: Request, uri: &str, record: bool, target: &dyn Handler,
) -> Response {
    if record {
        let reference = req.reference();
        req.attributes.insert_if_absent(CAPTURED, reference);
    }

    // Detect recursive redirection
    let uri = Uri::from(uri);
    let mut history =
        req.attributes.get(HISTORY).unwrap_or_default().to_string();
    if history.lines().any(|line| line == uri.path) {
        warn!("recursive redirection to \"{}\"", uri.path);
        return Response::from_status(Status::InternalServerError);
    }
    if !history.is_empty() {
        history.push('\n');
    }
    history.push_str(&uri.path);
    req.attributes.insert(HISTORY, history);

    // Forward relative to application root
    let root = req.attributes.get(ROOT).unwrap_or_default().to_string();
    req.attributes.insert(BASE, root);
    let query = uri.query.or(req.uri.query.take());
    req.uri = Uri::from_parts(uri.path, query);
    target.handle(req)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn echo(req: Request) -> Response {
        let captured = req.attributes.get(CAPTURED).unwrap_or_default();
        let query = req.uri.query.clone().unwrap_or_default();
        Response::from_text(format!("{}|{captured}|{query}", req.uri.path))
    }

    #[test]
    fn forwards_with_original_reference() {
        let req = Request::new().uri("/a/?x=1").attribute(BASE, "/app");
        let res = forward(req, "/b/", true, &echo);
        assert_eq!(res.body, b"/b/|/app/a/|x=1");
    }

    #[test]
    fn keeps_first_recorded_reference() {
        let req = Request::new().uri("/a/").attribute(CAPTURED, "/first/");
        let res = forward(req, "/b/?y=2", true, &echo);
        assert_eq!(res.body, b"/b/|/first/|y=2");
    }

    #[test]
    fn detects_recursive_redirection() {
        let req = Request::new().uri("/a/").attribute(HISTORY, "/x/\n/b/");
        let res = forward(req, "/b/", true, &echo);
        assert_eq!(res.status, Status::InternalServerError);
    }

    #[test]
    fn captures_into_application_root() {
        let mut ctx = Context::new("app", ".");
        let node: CaptureNode = serde_json::from_value(serde_json::json!({
            "uri": "/items/{id}/!",
            "locals": { "source": "capture" }
        }))
        .unwrap();
        let handler = node.create(&mut ctx, "/").unwrap().into_handler();
        assert_eq!(ctx.hidden(), ["/items/{id}/"]);

        // Bind application root
        let root: Arc<dyn Handler> = Arc::new(|req: Request| {
            let source = req.attributes.get("source").unwrap_or_default();
            Response::from_text(format!("{}|{source}", req.uri.path))
        });
        ctx.app().bind(root);
        let req = Request::new().uri("/x/").attribute("id", "42");
        assert_eq!(handler.handle(req).body, b"/items/42/|capture");
    }

    #[test]
    fn answers_not_found_for_missing_application() {
        let ctx = Context::new("app", ".");
        let capture = Capture::new(&ctx, "/a/", Some("missing"));
        let res = capture.handle(Request::new());
        assert_eq!(res.status, Status::NotFound);
    }
}
