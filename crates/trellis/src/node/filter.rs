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

//! Filter node.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, warn};
use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Request, Response, ResponseExt, Status};
use trellis_serve::middleware::Middleware;

use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::document::DocumentSource;
use crate::executor::{Flow, Invocation, Purpose, Registry};
use crate::Result;

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Filter node, running a library document around the next node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterNode {
    /// Name of the library document.
    pub library: String,
    /// Next node.
    pub next: Descriptor,
}

/// Middleware running a library document around the next handler.
///
/// The document is looked up in the library directories on every request,
/// subject to the validity interval of the document sources, so changes are
/// picked up without reassembling the application. The executor of the
/// document decides before the next handler whether to continue, and may
/// alter the response afterwards.
pub struct Filter {
    /// Name of the library document.
    library: String,
    /// Document sources of library directories.
    sources: Arc<[DocumentSource]>,
    /// Library directories.
    libraries: Arc<[PathBuf]>,
    /// Collaborators.
    registry: Arc<Registry>,
    /// Language tag.
    language: String,
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for FilterNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        let next = ctx.resolve_handler(&self.next, uri)?;
        let filter = Filter {
            library: self.library.clone(),
            sources: Arc::clone(ctx.libraries()),
            libraries: Arc::clone(ctx.library_paths()),
            registry: Arc::clone(ctx.registry()),
            language: ctx.settings().code.default_language_tag.clone(),
        };
        Ok(Resolved::handler(Layer::new(filter, next)))
    }

    fn name(&self) -> &str {
        "filter"
    }
}

impl Middleware for Filter {
    fn process(&self, mut req: Request, next: &dyn Handler) -> Response {
        let document =
            self.sources.iter().find_map(|source| source.find(&self.library));
        let Some(document) = document else {
            error!("filter document not found: {}", self.library);
            return Response::from_status(Status::InternalServerError);
        };
        let Some(executor) = self.registry.executor(&document.extension) else {
            warn!("no executor for: {}", document.path.display());
            return Response::from_status(Status::InternalServerError);
        };

        // Run entry points around next handler
        let invocation = Invocation {
            document,
            purpose: Purpose::Filter,
            libraries: Arc::clone(&self.libraries),
            includes: Arc::from([]),
            language: self.language.clone(),
        };
        if let Flow::Stop(res) = executor.before(&invocation, &mut req) {
            return res;
        }
        let mut res = next.handle(req);
        executor.after(&invocation, &mut res);
        res
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use crate::executor::Executor;
    use crate::settings::Settings;
    use trellis_serve::http::Header;

    use super::*;

    /// Executor stopping requests without token, and tagging responses.
    struct Guard;

    impl Executor for Guard {
        fn handle(&self, _: &Invocation, _: Request) -> Response {
            Response::from_status(Status::NotFound)
        }

        fn before(&self, _: &Invocation, req: &mut Request) -> Flow {
            if req.attributes.contains("token") {
                req.attributes.insert("checked", "yes");
                Flow::Continue
            } else {
                Flow::Stop(Response::from_status(Status::Forbidden))
            }
        }

        fn after(&self, invocation: &Invocation, res: &mut Response) {
            res.headers.insert(Header::Vary, &invocation.document.name);
        }
    }

    fn context(name: &str, registry: Registry) -> Context {
        let root = env::temp_dir()
            .join(format!("trellis-filter-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("libraries/filters")).unwrap();
        fs::write(root.join("libraries/filters/guard.js"), "").unwrap();
        Context::new("app", root)
            .with_settings(Settings::default())
            .with_registry(Arc::new(registry))
    }

    fn filter(ctx: &mut Context, library: &str) -> Arc<dyn Handler> {
        let node = FilterNode {
            library: library.to_string(),
            next: Descriptor::node(|_: &mut Context, _: &str| {
                Ok::<_, crate::Error>(Resolved::handler(|req: Request| {
                    let checked = req.attributes.get("checked");
                    Response::from_text(checked.unwrap_or_default().to_string())
                }))
            }),
        };
        node.create(ctx, "/").unwrap().into_handler()
    }

    #[test]
    fn runs_entry_points_around_next() {
        let mut registry = Registry::default();
        registry.add_executor("js", Guard);
        let mut ctx = context("entry", registry);
        let handler = filter(&mut ctx, "filters/guard");
        let res = handler.handle(Request::new());
        assert_eq!(res.status, Status::Forbidden);
        let res = handler.handle(Request::new().attribute("token", "1"));
        assert_eq!(res.body, b"yes");
        assert_eq!(res.headers.get(Header::Vary), Some("filters/guard"));
    }

    #[test]
    fn fails_without_document_or_executor() {
        let mut ctx = context("missing", Registry::default());
        let handler = filter(&mut ctx, "filters/missing");
        let res = handler.handle(Request::new());
        assert_eq!(res.status, Status::InternalServerError);
        let handler = filter(&mut ctx, "filters/guard");
        let res = handler.handle(Request::new());
        assert_eq!(res.status, Status::InternalServerError);
    }
}
