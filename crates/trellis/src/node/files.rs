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

//! Static files node.

use serde::Deserialize;
use std::path::PathBuf;
use std::slice;
use std::sync::Arc;

use tracing::warn;
use trellis_serve::handler::{Handler, Layer, NotFound};
use trellis_serve::middleware::StaticFiles;

use crate::context::Context;
use crate::settings::Interval;
use crate::Result;

use super::chain::Chain;
use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Static files node.
///
/// Files are served from one or more root directories, which are resolved
/// against the application root. With several roots, the first root that
/// contains the requested file wins.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct StaticNode {
    /// Root directory, taking precedence over the list.
    pub root: Option<PathBuf>,
    /// Root directories.
    pub roots: Vec<PathBuf>,
    /// Whether to list directories without index file.
    pub listing_allowed: bool,
    /// Whether to determine content types from file extensions.
    pub negotiate: bool,
    /// Whether to compress responses.
    pub compress: bool,
    /// Time-to-live of remembered roots.
    pub cache_duration: Option<Interval>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl StaticNode {
    /// Returns the configured root directories.
    fn roots(&self) -> &[PathBuf] {
        match &self.root {
            Some(root) => slice::from_ref(root),
            None => &self.roots,
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for StaticNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        let mut handlers = Vec::new();
        for root in self.roots() {
            let path = ctx.path(root);
            match StaticFiles::new(&path) {
                Ok(files) => {
                    let files = files
                        .media_types(ctx.media_types().clone())
                        .negotiate(self.negotiate)
                        .listing(self.listing_allowed);
                    handlers.push(Arc::new(files) as Arc<dyn Handler>);
                }
                Err(err) => warn!("skipping root {}: {err}", path.display()),
            }
        }

        // Offer requests to roots in order
        let handler: Arc<dyn Handler> = match handlers.len() {
            0 => Arc::new(NotFound),
            1 => handlers.remove(0),
            _ => {
                let ttl = match self.cache_duration {
                    Some(interval) => interval.0,
                    None => ctx.chain_ttl(),
                };
                Arc::new(Chain::new(handlers, ttl))
            }
        };
        if self.compress {
            Ok(Resolved::handler(Layer::new(ctx.compress(), handler)))
        } else {
            Ok(Resolved::Handler(handler))
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

impl Default for StaticNode {
    fn default() -> Self {
        Self {
            root: None,
            roots: vec![PathBuf::from("resources")],
            listing_allowed: false,
            negotiate: true,
            compress: true,
            cache_duration: None,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::{env, fs, process};

    use trellis_serve::http::{Header, Request, Response, Status};

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let root = env::temp_dir()
            .join(format!("trellis-static-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("resources")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("resources/app.css"), "body {}").unwrap();
        fs::write(root.join("public/app.css"), "shadowed").unwrap();
        fs::write(root.join("public/robots.txt"), "robots").unwrap();
        root
    }

    fn get(node: serde_json::Value, root: PathBuf, path: &str) -> Response {
        let node: StaticNode = serde_json::from_value(node).unwrap();
        let mut ctx = Context::new("app", root);
        let handler = node.create(&mut ctx, "/*").unwrap().into_handler();
        handler.handle(Request::new().uri(path))
    }

    #[test]
    fn serves_files_from_default_root() {
        let root = fixture("default");
        let res = get(json!({}), root, "/app.css");
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.body, b"body {}");
        assert_eq!(res.media_type(), Some("text/css"));
    }

    #[test]
    fn offers_requests_to_roots_in_order() {
        let root = fixture("roots");
        let node = json!({ "roots": ["resources", "public"] });
        let res = get(node.clone(), root.clone(), "/app.css");
        assert_eq!(res.body, b"body {}");
        let res = get(node.clone(), root.clone(), "/robots.txt");
        assert_eq!(res.body, b"robots");
        let res = get(node, root, "/missing.txt");
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn skips_missing_roots() {
        let root = fixture("missing");
        let node = json!({ "roots": ["none", "public"], "negotiate": false });
        let res = get(node, root.clone(), "/robots.txt");
        assert_eq!(res.body, b"robots");
        assert_eq!(
            res.headers.get(Header::ContentType),
            Some("application/octet-stream")
        );
        let res = get(json!({ "root": "nowhere" }), root, "/robots.txt");
        assert_eq!(res.status, Status::NotFound);
    }
}
