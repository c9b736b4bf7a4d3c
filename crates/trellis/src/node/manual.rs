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

//! Manual and template resource nodes.

use httpdate::{fmt_http_date, parse_http_date};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{fmt, io};

use tracing::warn;
use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Header, Request, Response, ResponseExt, Status, Uri};

use crate::context::Context;
use crate::document::{Document, DocumentSource};
use crate::executor::{Invocation, Purpose, Registry};
use crate::settings::MaxAge;
use crate::{Error, Result};

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Default internal URI of the manual resource.
pub const INTERNAL_URI: &str = "/_manual/";

/// Default root directory of documents.
const ROOT: &str = "resources";

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Client caching mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientCaching {
    /// No caching headers.
    Disabled,
    /// Modification dates and conditional requests.
    #[default]
    Conditional,
    /// Modification dates, conditional requests and expiration.
    Offline,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Manual resource node.
///
/// There's at most one manual resource per application. All fields are
/// optional, so a bare `manual` can refer to the configured one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ManualNode {
    /// Root directory.
    pub root: Option<PathBuf>,
    /// Library documents served through the manual resource.
    pub pass_throughs: Option<Vec<String>>,
    /// Token before the extension of documents.
    pub pre_extension: Option<String>,
    /// Document name used for directory requests.
    pub default_document_name: Option<String>,
    /// Extension assumed for documents.
    pub default_extension: Option<String>,
    /// Whether to redirect requests without trailing slash.
    pub trailing_slash_required: Option<bool>,
    /// URI at which the manual resource is mounted internally.
    pub internal_uri: Option<String>,
    /// Client caching mode.
    pub client_caching_mode: Option<ClientCaching>,
    /// Client caching age in offline mode.
    pub max_client_caching_duration: Option<MaxAge>,
    /// Whether to compress responses.
    pub compress: Option<bool>,
}

/// Template resource node.
///
/// There's at most one template resource per application, following the
/// same rules as the manual resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct TemplatesNode {
    /// Root directory.
    pub root: Option<PathBuf>,
    /// Directories searched for included templates.
    pub include_roots: Option<Vec<PathBuf>>,
    /// Library documents served through the template resource.
    pub pass_throughs: Option<Vec<String>>,
    /// Token before the extension of documents.
    pub pre_extension: Option<String>,
    /// Document name used for directory requests.
    pub default_document_name: Option<String>,
    /// Extension assumed for documents.
    pub default_extension: Option<String>,
    /// Client caching mode.
    pub client_caching_mode: Option<ClientCaching>,
    /// Client caching age in offline mode.
    pub max_client_caching_duration: Option<MaxAge>,
    /// Whether to compress responses.
    pub compress: Option<bool>,
}

/// Handler executing documents.
///
/// Request paths are mapped to documents through a document source, and
/// library documents named as pass-throughs are served as well. Documents
/// are handed to the executor registered for their extension.
pub struct Documents {
    /// Document source.
    source: DocumentSource,
    /// Library documents served through this handler.
    pass_throughs: Vec<String>,
    /// Document sources of library directories.
    libraries: Arc<[DocumentSource]>,
    /// Invocation template.
    invocation: Template,
    /// Collaborators.
    registry: Arc<Registry>,
    /// Whether to redirect requests without trailing slash.
    trailing_slash: bool,
    /// Client caching mode.
    caching: ClientCaching,
    /// Client caching age in offline mode.
    max_age: MaxAge,
}

/// Invocation fields shared by all documents.
struct Template {
    /// Purpose.
    purpose: Purpose,
    /// Library directories.
    libraries: Arc<[PathBuf]>,
    /// Include directories.
    includes: Arc<[PathBuf]>,
    /// Language tag.
    language: String,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl ManualNode {
    /// Returns the URI at which the manual resource is mounted internally.
    #[must_use]
    pub fn internal_uri(&self) -> &str {
        self.internal_uri.as_deref().unwrap_or(INTERNAL_URI)
    }

    /// Adds a library document served through the manual resource.
    pub fn add_pass_through(&mut self, name: String) {
        let list = self.pass_throughs.get_or_insert_with(Vec::new);
        if !list.contains(&name) {
            list.push(name);
        }
    }

    /// Creates the handler for the manual resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the root exists, but is not a directory.
    pub fn documents(&self, ctx: &Context) -> Result<Arc<dyn Handler>> {
        let code = &ctx.settings().code;
        let root = self.root.as_deref().unwrap_or(Path::new(ROOT));
        let name = self.default_document_name.as_deref();
        let ext = self.default_extension.as_deref();
        let source = DocumentSource::new(checked(ctx.path(root))?)
            .pre_extension(Some(self.pre_extension.as_deref().unwrap_or("m")))
            .default_name(name.unwrap_or(&code.default_document_name))
            .default_extension(ext.unwrap_or(&code.default_extension))
            .validity(ctx.validity());
        let documents = Documents {
            source,
            pass_throughs: self.pass_throughs.clone().unwrap_or_default(),
            libraries: Arc::clone(ctx.libraries()),
            invocation: Template::new(ctx, Purpose::Manual, Vec::new()),
            registry: Arc::clone(ctx.registry()),
            trailing_slash: self.trailing_slash_required.unwrap_or(true),
            caching: self.client_caching_mode.unwrap_or_default(),
            max_age: self.max_client_caching_duration.unwrap_or_default(),
        };
        Ok(compressed(ctx, documents, self.compress.unwrap_or(true)))
    }
}

impl TemplatesNode {
    /// Creates the handler for the template resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the root exists, but is not a directory.
    pub fn documents(&self, ctx: &Context) -> Result<Arc<dyn Handler>> {
        let root = self.root.as_deref().unwrap_or(Path::new(ROOT));
        let name = self.default_document_name.as_deref();
        let ext = self.default_extension.as_deref();
        let source = DocumentSource::new(checked(ctx.path(root))?)
            .pre_extension(Some(self.pre_extension.as_deref().unwrap_or("t")))
            .default_name(name.unwrap_or("index"))
            .default_extension(ext.unwrap_or("html"))
            .validity(ctx.validity());
        let includes = match &self.include_roots {
            Some(roots) => roots.iter().map(|root| ctx.path(root)).collect(),
            None => vec![ctx.path("libraries/includes")],
        };
        let documents = Documents {
            source,
            pass_throughs: self.pass_throughs.clone().unwrap_or_default(),
            libraries: Arc::clone(ctx.libraries()),
            invocation: Template::new(ctx, Purpose::Template, includes),
            registry: Arc::clone(ctx.registry()),
            trailing_slash: false,
            caching: self.client_caching_mode.unwrap_or_default(),
            max_age: self.max_client_caching_duration.unwrap_or_default(),
        };
        Ok(compressed(ctx, documents, self.compress.unwrap_or(true)))
    }
}

impl Documents {
    /// Finds the document for the given request path.
    fn find(&self, path: &str) -> Option<Document> {
        self.source.find(path).or_else(|| {
            let name = path.trim_matches('/');
            self.pass_throughs
                .iter()
                .any(|pass| pass.trim_matches('/') == name)
                .then(|| self.libraries.iter().find_map(|lib| lib.find(name)))
                .flatten()
        })
    }

    /// Returns whether the client holds a fresh copy of the document.
    fn is_fresh(&self, req: &Request, document: &Document) -> bool {
        if self.caching == ClientCaching::Disabled {
            return false;
        }
        let since = req.headers.get(Header::IfModifiedSince);
        let since = since.and_then(|value| parse_http_date(value).ok());
        match (since, document.modified) {
            (Some(since), Some(modified)) => is_unmodified(since, modified),
            _ => false,
        }
    }

    /// Adds client caching headers to the response.
    fn cache(&self, res: &mut Response, modified: Option<SystemTime>) {
        if self.caching == ClientCaching::Disabled || !res.status.is_success() {
            return;
        }
        if let Some(modified) = modified {
            let value = fmt_http_date(modified);
            res.headers.insert_if_absent(Header::LastModified, value);
        }
        if self.caching == ClientCaching::Offline && self.max_age.0 > 0 {
            let value = format!("max-age={}", self.max_age.0);
            res.headers.insert_if_absent(Header::CacheControl, value);
        }
    }
}

impl Template {
    /// Creates the invocation fields for the given purpose.
    fn new(ctx: &Context, purpose: Purpose, includes: Vec<PathBuf>) -> Self {
        Self {
            purpose,
            libraries: Arc::clone(ctx.library_paths()),
            includes: includes.into(),
            language: ctx.settings().code.default_language_tag.clone(),
        }
    }

    /// Creates the invocation for the given document.
    fn invocation(&self, document: Document) -> Invocation {
        Invocation {
            document,
            purpose: self.purpose,
            libraries: Arc::clone(&self.libraries),
            includes: Arc::clone(&self.includes),
            language: self.language.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for ManualNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        ctx.manual(self).map(Resolved::handler)
    }

    fn name(&self) -> &str {
        "manual"
    }
}

impl Node for TemplatesNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        ctx.templates(self).map(Resolved::handler)
    }

    fn name(&self) -> &str {
        "templates"
    }
}

impl Handler for Documents {
    fn handle(&self, req: Request) -> Response {
        let Some(document) = self.find(&req.uri.path) else {
            return Response::from_status(Status::NotFound);
        };

        // Directory-like documents are only served with a trailing slash
        if self.trailing_slash && !req.uri.path.ends_with('/') {
            let path = format!("{}/", req.reference());
            let location = Uri::from_parts(path, req.uri.query.as_deref());
            return Response::redirect(Status::MovedPermanently, location);
        }
        let Some(executor) = self.registry.executor(&document.extension) else {
            warn!("no executor for: {}", document.path.display());
            return Response::from_status(Status::InternalServerError);
        };

        // Answer with "304 Not Modified" if the client has a fresh copy
        if self.is_fresh(&req, &document) {
            return Response::from_status(Status::NotModified);
        }
        let modified = document.modified;
        let invocation = self.invocation.invocation(document);
        let mut res = executor.handle(&invocation, req);
        self.cache(&mut res, modified);
        res
    }
}

impl fmt::Debug for Documents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Documents")
            .field("source", &self.source)
            .field("pass_throughs", &self.pass_throughs)
            .field("caching", &self.caching)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Ensures the given root is a directory, if it exists.
fn checked(root: PathBuf) -> Result<PathBuf> {
    if root.exists() && !root.is_dir() {
        let message = format!("not a directory: {}", root.display());
        let err = io::Error::new(io::ErrorKind::InvalidInput, message);
        return Err(Error::Io(err));
    }
    if !root.exists() {
        warn!("missing document root: {}", root.display());
    }
    Ok(root)
}

/// Returns whether a file modified at the given time is unmodified since the
/// given date, which is truncated to whole seconds like all header dates.
fn is_unmodified(since: SystemTime, modified: SystemTime) -> bool {
    modified
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()))
        .is_ok_and(|modified| since >= modified)
}

/// Wraps the given handler for response compression, if enabled.
fn compressed<H>(ctx: &Context, handler: H, compress: bool) -> Arc<dyn Handler>
where
    H: Handler,
{
    if compress {
        Arc::new(Layer::new(ctx.compress(), Arc::new(handler)))
    } else {
        Arc::new(handler)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::{env, fs, process};

    use crate::executor::Executor;

    use super::*;

    /// Executor answering with the document name and purpose.
    struct Echo;

    impl Executor for Echo {
        fn handle(&self, invocation: &Invocation, req: Request) -> Response {
            let purpose = match invocation.purpose {
                Purpose::Manual => "manual",
                Purpose::Template => "template",
                Purpose::Filter => "filter",
            };
            let name = &invocation.document.name;
            Response::from_text(format!("{purpose}:{name}:{}", req.uri.path))
        }
    }

    fn context(name: &str) -> Context {
        let root = env::temp_dir()
            .join(format!("trellis-manual-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("resources/person")).unwrap();
        fs::create_dir_all(root.join("libraries/dispatchers")).unwrap();
        fs::write(root.join("resources/person.m.js"), "").unwrap();
        fs::write(root.join("resources/about.t.html"), "").unwrap();
        fs::write(root.join("resources/notes.m.rb"), "").unwrap();
        fs::write(root.join("libraries/dispatchers/lang.js"), "").unwrap();
        let mut registry = Registry::default();
        registry.add_executor("js", Echo);
        registry.add_executor("html", Echo);
        Context::new("app", root).with_registry(Arc::new(registry))
    }

    fn manual(ctx: &Context, config: serde_json::Value) -> Arc<dyn Handler> {
        let node: ManualNode = serde_json::from_value(config).unwrap();
        node.documents(ctx).unwrap()
    }

    #[test]
    fn executes_documents() {
        let ctx = context("execute");
        let handler = manual(&ctx, json!({}));
        let res = handler.handle(Request::new().uri("/person/"));
        assert_eq!(res.body, b"manual:person:/person/");
        let res = handler.handle(Request::new().uri("/missing/"));
        assert_eq!(res.status, Status::NotFound);
        let res = handler.handle(Request::new().uri("/notes/"));
        assert_eq!(res.status, Status::InternalServerError);
    }

    #[test]
    fn redirects_to_trailing_slash() {
        let ctx = context("slash");
        let handler = manual(&ctx, json!({}));
        let res = handler.handle(Request::new().uri("/person?page=2"));
        assert_eq!(res.status, Status::MovedPermanently);
        assert_eq!(res.headers.get(Header::Location), Some("/person/?page=2"));
        let handler = manual(&ctx, json!({ "trailingSlashRequired": false }));
        let res = handler.handle(Request::new().uri("/person"));
        assert_eq!(res.status, Status::Ok);
    }

    #[test]
    fn serves_pass_throughs_from_libraries() {
        let ctx = context("pass");
        let mut node = ManualNode::default();
        let req = || Request::new().uri("/dispatchers/lang/");
        let handler = node.documents(&ctx).unwrap();
        assert_eq!(handler.handle(req()).status, Status::NotFound);
        node.add_pass_through(String::from("dispatchers/lang"));
        node.add_pass_through(String::from("dispatchers/lang"));
        assert_eq!(node.pass_throughs.as_ref().map(Vec::len), Some(1));
        let handler = node.documents(&ctx).unwrap();
        let res = handler.handle(req());
        assert_eq!(res.body, b"manual:dispatchers/lang:/dispatchers/lang/");
    }

    #[test]
    fn answers_conditional_requests() {
        let ctx = context("conditional");
        let handler = manual(&ctx, json!({
            "clientCachingMode": "offline",
            "maxClientCachingDuration": "1h"
        }));
        let res = handler.handle(Request::new().uri("/person/"));
        let cache_control = res.headers.get(Header::CacheControl);
        assert_eq!(cache_control, Some("max-age=3600"));
        let modified = res.headers.get(Header::LastModified).unwrap();
        let req = Request::new()
            .uri("/person/")
            .header(Header::IfModifiedSince, modified);
        let res = handler.handle(req);
        assert_eq!(res.status, Status::NotModified);
    }

    #[test]
    fn compares_modification_in_whole_seconds() {
        let since = UNIX_EPOCH + Duration::from_secs(1_000);
        let modified = since + Duration::from_millis(500);
        assert!(is_unmodified(since, modified));
        assert!(!is_unmodified(since, since + Duration::from_secs(1)));
        let modified = since + Duration::from_millis(1_900);
        assert!(!is_unmodified(since, modified));
        assert!(is_unmodified(since + Duration::from_secs(5), modified));
    }

    #[test]
    fn rejects_unknown_caching_modes() {
        let config = json!({ "clientCachingMode": "aggressive" });
        assert!(serde_json::from_value::<ManualNode>(config).is_err());
    }

    #[test]
    fn executes_templates() {
        let ctx = context("templates");
        let node = TemplatesNode::default();
        let handler = node.documents(&ctx).unwrap();
        let res = handler.handle(Request::new().uri("/about"));
        assert_eq!(res.body, b"template:about:/about");
    }
}
