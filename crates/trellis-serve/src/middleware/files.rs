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

//! Middleware for serving static files.

use httpdate::{fmt_http_date, parse_http_date};
use std::fs;
use std::io::Result;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::handler::{Handler, NotFound};
use crate::http::media::OCTET_STREAM;
use crate::http::response::ResponseExt;
use crate::http::{Header, MediaTypes, Method, Request, Response, Status, Uri};
use crate::middleware::Middleware;

mod listing;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for serving static files.
///
/// Files are resolved relative to the root directory, using the request path,
/// which is relative to the mount point when used below a [`BasePath`][] or a
/// prefix route. Requests for files that don't exist are forwarded to the
/// next handler, which makes it possible to chain several roots.
///
/// [`BasePath`]: crate::middleware::BasePath
///
/// # Examples
///
/// ```no_run
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis_serve::middleware::StaticFiles;
///
/// // Create middleware serving files with directory listings
/// let middleware = StaticFiles::new("public")?.listing(true);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct StaticFiles {
    /// Root directory.
    root: PathBuf,
    /// Media types.
    types: MediaTypes,
    /// Whether to determine content types from file extensions.
    negotiate: bool,
    /// Whether to list directories without index file.
    listing: bool,
    /// Index file name.
    index: String,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl StaticFiles {
    /// Creates a middleware for serving static files.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory doesn't exist.
    pub fn new<P>(root: P) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        root.into().canonicalize().map(|root| Self {
            root,
            types: MediaTypes::default(),
            negotiate: true,
            listing: false,
            index: String::from("index.html"),
        })
    }

    /// Sets the media type table.
    #[must_use]
    pub fn media_types(mut self, types: MediaTypes) -> Self {
        self.types = types;
        self
    }

    /// Sets whether content types are determined from file extensions.
    #[must_use]
    pub fn negotiate(mut self, negotiate: bool) -> Self {
        self.negotiate = negotiate;
        self
    }

    /// Sets whether directories without index file are listed.
    #[must_use]
    pub fn listing(mut self, listing: bool) -> Self {
        self.listing = listing;
        self
    }

    /// Sets the index file name.
    #[must_use]
    pub fn index<S>(mut self, index: S) -> Self
    where
        S: Into<String>,
    {
        self.index = index.into();
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the request path to a path below the root directory,
    /// rejecting any attempt to escape from it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let safe = relative.components().all(|component| {
            matches!(component, Component::Normal(_) | Component::CurDir)
        });
        safe.then(|| self.root.join(relative))
    }

    /// Serves the given file, honoring conditional requests.
    fn serve(&self, req: &Request, full: &Path) -> Option<Response> {
        let mut res = Response::from_file(full, &self.types).ok()?;
        if !self.negotiate {
            res.headers.insert(Header::ContentType, OCTET_STREAM);
        }
        res.headers.insert(Header::Date, fmt_http_date(SystemTime::now()));

        // Answer with "304 Not Modified" if the client has a fresh copy
        let since = req.headers.get(Header::IfModifiedSince);
        if let Some(Ok(date)) = since.map(parse_http_date) {
            let modified = fs::metadata(full).and_then(|meta| meta.modified());
            if let Ok(modified) = modified {
                // Subtract one second to account for rounding issues
                if date >= modified - Duration::from_secs(1) {
                    return Some(
                        Response::new()
                            .status(Status::NotModified)
                            .header(Header::ContentLength, 0),
                    );
                }
            }
        }

        // Head requests only receive headers
        if req.method == Method::Head {
            res.body.clear();
        }
        Some(res)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for StaticFiles {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        if !matches!(req.method, Method::Get | Method::Head) {
            return next.handle(req);
        }
        let Some(full) = self.resolve(&req.uri.path) else {
            return next.handle(req);
        };

        // Directories are only served with a trailing slash, either through
        // their index file, or as a listing, if enabled
        if full.is_dir() {
            if !req.uri.path.ends_with('/') {
                let mut reference = req.reference();
                reference.push('/');
                let uri = Uri::from_parts(reference, req.uri.query);
                return Response::redirect(Status::Found, uri);
            }
            let index = full.join(&self.index);
            if index.is_file() {
                if let Some(res) = self.serve(&req, &index) {
                    return res;
                }
            } else if self.listing {
                if let Ok(html) = listing::render(&full, &req.reference()) {
                    return Response::new()
                        .header(Header::ContentType, "text/html; charset=utf-8")
                        .header(Header::ContentLength, html.len())
                        .body(html);
                }
            }
            return next.handle(req);
        }

        // Serve file, or forward to next handler
        match self.serve(&req, &full) {
            Some(res) => res,
            None => next.handle(req),
        }
    }
}

impl Handler for StaticFiles {
    /// Handles the given request, answering "404 Not Found" for missing files.
    #[inline]
    fn handle(&self, req: Request) -> Response {
        self.process(req, &NotFound)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::env;
    use std::process;

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let dir = env::temp_dir()
            .join(format!("trellis-serve-{}-{name}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join("css/app.css"), "body {}").unwrap();
        fs::write(dir.join("notes.txt"), "hello").unwrap();
        dir
    }

    #[test]
    fn serves_files_with_media_type() {
        let files = StaticFiles::new(fixture("serve")).unwrap();
        let res = files.handle(Request::new().uri("/css/app.css"));
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.headers.get(Header::ContentType), Some("text/css"));
        assert_eq!(res.body, b"body {}");
    }

    #[test]
    fn forwards_missing_files() {
        let files = StaticFiles::new(fixture("missing")).unwrap();
        let res = files.handle(Request::new().uri("/css/missing.css"));
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn rejects_traversal() {
        let files = StaticFiles::new(fixture("traversal")).unwrap();
        let res = files.handle(Request::new().uri("/css/../../etc/passwd"));
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn lists_directories_if_enabled() {
        let files = StaticFiles::new(fixture("listing")).unwrap();
        let res = files.handle(Request::new().uri("/"));
        assert_eq!(res.status, Status::NotFound);

        let files = files.listing(true);
        let res = files.handle(Request::new().uri("/"));
        let html = String::from_utf8(res.body).unwrap();
        assert!(html.contains(r#"<a href="/css/">css/</a>"#));
        assert!(html.contains(r#"<a href="/notes.txt">notes.txt</a>"#));
    }

    #[test]
    fn disables_negotiation() {
        let files = StaticFiles::new(fixture("negotiate"))
            .unwrap()
            .negotiate(false);
        let res = files.handle(Request::new().uri("/notes.txt"));
        assert_eq!(res.headers.get(Header::ContentType), Some(OCTET_STREAM));
    }

    #[test]
    fn answers_conditional_requests() {
        let files = StaticFiles::new(fixture("conditional")).unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        let req = Request::new()
            .uri("/notes.txt")
            .header(Header::IfModifiedSince, fmt_http_date(later));
        assert_eq!(files.handle(req).status, Status::NotModified);
    }
}
