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

//! Redirect nodes.

use serde::Deserialize;
use std::sync::Arc;

use trellis_serve::handler::{Handler, Layer, NotFound};
use trellis_serve::http::{Request, Response, ResponseExt, Status, Uri};
use trellis_serve::middleware::{NormalizePath, TrailingSlash};

use crate::context::Context;
use crate::template::Template;
use crate::Result;

use super::capture::Capture;
use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Redirect mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RedirectMode {
    /// 301 Moved Permanently.
    #[default]
    Permanent,
    /// 302 Found.
    Found,
    /// 303 See Other.
    SeeOther,
    /// 307 Temporary Redirect.
    Temporary,
    /// Internal redirect to another application.
    ServerOutbound,
    /// Internal redirect within the application.
    ServerInbound,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Redirect node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RedirectNode {
    /// Target URI template.
    pub uri: String,
    /// Redirect mode.
    #[serde(default)]
    pub mode: RedirectMode,
}

/// Redirect node adding a trailing slash.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddSlashNode {}

/// Redirect.
#[derive(Debug)]
pub struct Redirect {
    /// Target URI template.
    uri: Template,
    /// Status.
    status: Status,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl RedirectMode {
    /// Returns the status of client redirects, or nothing for internal ones.
    #[must_use]
    pub fn status(self) -> Option<Status> {
        match self {
            RedirectMode::Permanent => Some(Status::MovedPermanently),
            RedirectMode::Found => Some(Status::Found),
            RedirectMode::SeeOther => Some(Status::SeeOther),
            RedirectMode::Temporary => Some(Status::TemporaryRedirect),
            RedirectMode::ServerOutbound | RedirectMode::ServerInbound => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for RedirectNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        Ok(match self.mode.status() {
            Some(status) => Resolved::handler(Redirect {
                uri: Template::new(&self.uri),
                status,
            }),
            None => Resolved::handler(
                Capture::new(ctx, &self.uri, None).record(false),
            ),
        })
    }

    fn name(&self) -> &str {
        "redirect"
    }
}

impl Node for AddSlashNode {
    fn create(&self, _ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        let middleware = NormalizePath::new(TrailingSlash::Append)
            .status(Status::MovedPermanently)
            .skip_files(false);
        Ok(Resolved::handler(Layer::new(middleware, Arc::new(NotFound))))
    }

    fn name(&self) -> &str {
        "addSlash"
    }
}

// ----------------------------------------------------------------------------

impl Handler for Redirect {
    fn handle(&self, req: Request) -> Response {
        let location = Uri::from(self.uri.expand(&req));
        Response::redirect(self.status, location)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::http::Header;

    use super::*;

    #[test]
    fn redirects_to_expanded_template() {
        let mut ctx = Context::new("app", ".");
        let node = RedirectNode {
            uri: String::from("/new/{id}/?from={rp}"),
            mode: RedirectMode::SeeOther,
        };
        let handler = node.create(&mut ctx, "/").unwrap().into_handler();
        let req = Request::new().uri("/old/").attribute("id", "7");
        let res = handler.handle(req);
        assert_eq!(res.status, Status::SeeOther);
        assert_eq!(
            res.headers.get(Header::Location),
            Some("/new/7/?from=/old/")
        );
    }

    #[test]
    fn redirects_internally_in_server_modes() {
        let mut ctx = Context::new("app", ".");
        let node = RedirectNode {
            uri: String::from("/target/"),
            mode: RedirectMode::ServerInbound,
        };
        let handler = node.create(&mut ctx, "/").unwrap().into_handler();
        let root: Arc<dyn Handler> = Arc::new(|req: Request| {
            Response::from_text(req.uri.path)
        });
        ctx.app().bind(root);
        let res = handler.handle(Request::new().uri("/source/"));
        assert_eq!(res.body, b"/target/");
    }

    #[test]
    fn adds_trailing_slash() {
        let mut ctx = Context::new("app", ".");
        let handler =
            AddSlashNode {}.create(&mut ctx, "/").unwrap().into_handler();
        let res = handler.handle(Request::new().uri("/docs?page=2"));
        assert_eq!(res.status, Status::MovedPermanently);
        assert_eq!(res.headers.get(Header::Location), Some("/docs/?page=2"));
        let res = handler.handle(Request::new().uri("/docs/"));
        assert_eq!(res.status, Status::NotFound);
    }
}
