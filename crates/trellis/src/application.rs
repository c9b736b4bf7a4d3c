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

//! Applications.

use crossbeam::channel::unbounded;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::{fmt, mem};

use tracing::{info, info_span, warn};
use trellis_serve::handler::matcher::Route;
use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Request, Response, Status};
use trellis_serve::middleware::Middleware;

use super::attribute::{BASE, ERROR, HISTORY, ROOT};
use super::component::{Component, INTERNAL_HOST};
use super::config::{AppConfig, Dispatchers};
use super::context::Context;
use super::executor::{Compiler, Executor, Minifier, Registry};
use super::node::capture::Capture;
use super::node::router::{RouterNode, RoutingMode};
use super::{Error, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Application.
///
/// An application is the handler tree assembled from an [`AppConfig`], with
/// the root router at its top. It's attached to the virtual hosts of a
/// [`Component`], and records its mount point in the request attributes, so
/// captures can address URIs relative to it.
pub struct Application {
    /// Application name.
    name: String,
    /// Logger name.
    logger: String,
    /// Root handler.
    handler: Arc<dyn Handler>,
    /// Dispatch table configuration.
    dispatchers: Dispatchers,
    /// Values exposed to dispatchers.
    globals: BTreeMap<String, Value>,
    /// URIs requested after startup.
    preheat: Vec<String>,
}

/// Applications of a component, by name.
///
/// Applications are held weakly, so the registry can be shared with every
/// capture into another application without keeping them alive.
#[derive(Clone, Debug, Default)]
pub struct Applications(Arc<DashMap<String, Weak<Application>>>);

/// Application assembler.
///
/// The assembler resolves the route table of an application into its handler
/// tree, and attaches the application to the virtual hosts of a component.
/// Executors, compilers, minifiers and resources are provided by the
/// embedding program before assembly.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::application::Assembler;
/// use trellis::component::{Component, INTERNAL_HOST};
/// use trellis_serve::http::{Request, Status};
///
/// // Create component and assemble application
/// let mut component = Component::new();
/// let config = r#"{ "routes": { "/coffee/": "!418" } }"#.parse()?;
/// Assembler::new("cafe", ".", config).assemble(&mut component)?;
///
/// // Handle request
/// let req = Request::new().uri("/cafe/coffee/");
/// let res = component.handle(INTERNAL_HOST, req);
/// assert_eq!(res.status, Status::ImATeapot);
/// # Ok(())
/// # }
/// ```
pub struct Assembler {
    /// Application name.
    name: String,
    /// Application root directory.
    root: PathBuf,
    /// Application configuration.
    config: AppConfig,
    /// Collaborators.
    registry: Registry,
}

/// Middleware replacing error responses with error pages.
struct ErrorPages {
    /// Error pages by status code.
    pages: BTreeMap<u16, Capture>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Application {
    /// Requests all preheat URIs concurrently.
    ///
    /// Every URI is requested internally on its own worker thread, so hidden
    /// URIs can be preheated, and the statuses are returned in the order of
    /// the URIs. Workers that fail to answer are reported as "500 Internal
    /// Server Error".
    pub fn preheat(&self) -> Vec<Status> {
        let span = info_span!("application", app = self.logger.as_str());
        let _guard = span.enter();
        let (sender, receiver) = unbounded();
        let result = crossbeam::scope(|scope| {
            for (index, uri) in self.preheat.iter().enumerate() {
                let sender = sender.clone();
                let span = span.clone();
                scope.spawn(move |_| {
                    let _guard = span.enter();
                    let req = Request::new().uri(uri.as_str());
                    let path = req.uri.path.clone();
                    let res = self.handle(req.attribute(HISTORY, path));
                    info!("preheated \"{uri}\": {}", res.status.code());
                    let _ = sender.send((index, res.status));
                });
            }
        });
        if result.is_err() {
            warn!("preheat worker panicked");
        }

        // Collect statuses in order
        drop(sender);
        let mut statuses =
            vec![Status::InternalServerError; self.preheat.len()];
        for (index, status) in receiver {
            statuses[index] = status;
        }
        statuses
    }
}

#[allow(clippy::must_use_candidate)]
impl Application {
    /// Returns the application name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dispatch table configuration.
    #[inline]
    pub fn dispatchers(&self) -> &Dispatchers {
        &self.dispatchers
    }

    /// Returns the values exposed to dispatchers.
    #[inline]
    pub fn globals(&self) -> &BTreeMap<String, Value> {
        &self.globals
    }
}

// ----------------------------------------------------------------------------

impl Applications {
    /// Returns the application with the given name, if it's still alive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Application>> {
        self.0.get(name).and_then(|app| app.upgrade())
    }

    /// Registers the given application.
    pub fn insert(&self, app: &Arc<Application>) {
        self.0.insert(app.name.clone(), Arc::downgrade(app));
    }
}

// ----------------------------------------------------------------------------

impl Assembler {
    /// Creates an assembler for the application with the given name, root
    /// directory and configuration.
    pub fn new<N, P>(name: N, root: P, config: AppConfig) -> Self
    where
        N: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            root: root.into(),
            config,
            registry: Registry::default(),
        }
    }

    /// Registers an executor for documents with the given extension.
    #[must_use]
    pub fn executor<E>(mut self, ext: &str, executor: E) -> Self
    where
        E: Executor,
    {
        self.registry.add_executor(ext, executor);
        self
    }

    /// Registers a style sheet compiler under the given name.
    #[must_use]
    pub fn compiler<C>(mut self, name: &str, compiler: C) -> Self
    where
        C: Compiler,
    {
        self.registry.add_compiler(name, compiler);
        self
    }

    /// Registers a minifier for sources with the given extension.
    #[must_use]
    pub fn minifier<M>(mut self, ext: &str, minifier: M) -> Self
    where
        M: Minifier,
    {
        self.registry.add_minifier(ext, minifier);
        self
    }

    /// Registers a handler under the given resource name.
    #[must_use]
    pub fn resource<H>(mut self, name: &str, handler: H) -> Self
    where
        H: Handler,
    {
        self.registry.add_resource(name, handler);
        self
    }

    /// Assembles the application and attaches it to the component.
    ///
    /// The route table is resolved into the root router, the manual resource
    /// is mounted at its internal URI, error pages and hidden routes are
    /// applied, and the application is attached to its virtual hosts. If no
    /// virtual hosts are configured, the application is attached to the
    /// internal host below its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, in which case the
    /// component is left unchanged.
    pub fn assemble(
        self, component: &mut Component,
    ) -> Result<Arc<Application>> {
        let Assembler { name, root, mut config, registry } = self;
        let logger = config.settings.logger(&name).to_string();
        let span = info_span!("application", app = logger.as_str());
        let _guard = span.enter();
        info!("assembling application \"{name}\"");

        // Resolve route table into root router
        let settings = mem::take(&mut config.settings);
        let mut ctx = Context::new(name.as_str(), root)
            .with_settings(settings)
            .with_registry(Arc::new(registry))
            .with_dispatchers(&config.dispatchers)
            .with_applications(component.applications().clone());
        let node = RouterNode {
            routes: mem::take(&mut config.routes),
            routing_mode: RoutingMode::Best,
            cache_duration: None,
        };
        let mut router = node.build(&mut ctx, "/")?;

        // Mount manual resource at its internal URI, if used
        if let Some((internal, slot)) = ctx.finish()? {
            let route: Route = format!("{internal}*").parse()?;
            router.attach(route.clone(), Arc::new(slot))?;
            router.hide(route);
        }
        let pages = error_pages(&mut ctx, &config.errors)?;
        for uri in ctx.hidden() {
            let route: Route =
                uri.parse().map_err(|err| Error::from(err).at(uri))?;
            router.hide(route);
        }

        // Bind application root weakly, as the router owns its captures
        let router: Arc<dyn Handler> = Arc::new(router);
        ctx.app().bind_weak(&router);
        let handler: Arc<dyn Handler> = if pages.is_empty() {
            router
        } else {
            Arc::new(Layer::new(ErrorPages { pages }, router))
        };

        // Validate virtual hosts before attaching to any of them
        let mut hosts: Vec<(String, String)> = config
            .hosts
            .iter()
            .map(|(host, base)| (host.clone(), base.clone()))
            .collect();
        if hosts.is_empty() {
            hosts.push((INTERNAL_HOST.to_string(), format!("/{name}/")));
        }
        for (host, _) in &hosts {
            if component.host(host).is_none() {
                return Err(Error::UnknownHost(host.clone()));
            }
        }
        let app = Arc::new(Application {
            globals: ctx.dispatch().globals(),
            name,
            logger,
            handler,
            dispatchers: config.dispatchers,
            preheat: config.preheat,
        });
        component.attach(&hosts, &app)?;
        info!("assembled application \"{}\"", app.name);
        Ok(app)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for Application {
    fn handle(&self, mut req: Request) -> Response {
        let base = req.attributes.get(BASE).unwrap_or_default().to_string();
        req.attributes.insert(ROOT, base);
        self.handler.handle(req)
    }
}

impl Middleware for ErrorPages {
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        if req.attributes.contains(ERROR) {
            return next.handle(req);
        }
        let original = req.clone();
        let res = next.handle(req);
        let Some(page) = self.pages.get(&res.status.code()) else {
            return res;
        };

        // Render error page, keeping the status unless the page fails
        let mut req = original;
        req.attributes.insert(ERROR, res.status.code().to_string());
        let mut page = page.handle(req);
        if page.status.is_success() {
            page.status = res.status;
        }
        page
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("dispatchers", &self.dispatchers)
            .field("preheat", &self.preheat)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates the error pages, hiding URIs marked with a trailing `!`.
fn error_pages(
    ctx: &mut Context, errors: &BTreeMap<u16, String>,
) -> Result<BTreeMap<u16, Capture>> {
    let mut pages = BTreeMap::new();
    for (&code, uri) in errors {
        Status::try_from(code).map_err(|_| Error::Status(code))?;
        let uri = match uri.strip_suffix('!') {
            Some(uri) => {
                ctx.hide(uri);
                uri
            }
            None => uri.as_str(),
        };
        pages.insert(code, Capture::new(ctx, uri, None));
    }
    Ok(pages)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::path::Path;
    use std::{env, fs, process};

    use crate::attribute::{CAPTURED, DISPATCH_DISPATCHER, DISPATCH_ID};
    use crate::executor::Invocation;
    use trellis_serve::http::{Header, ResponseExt};

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let root = env::temp_dir()
            .join(format!("trellis-application-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("resources/person")).unwrap();
        fs::create_dir_all(root.join("libraries/dispatchers")).unwrap();
        fs::write(root.join("resources/app.css"), "body {}").unwrap();
        fs::write(root.join("resources/person.m.js"), "").unwrap();
        fs::write(root.join("libraries/dispatchers/lang.js"), "").unwrap();
        root
    }

    /// Executor echoing the document and the dispatch attributes.
    fn echo(invocation: &Invocation, req: Request) -> Response {
        let get = |key: &str| {
            req.attributes.get(key).unwrap_or_default().to_string()
        };
        Response::from_text(format!(
            "{}|{}|{}|{}|{}",
            invocation.document.name,
            get(DISPATCH_ID),
            get(DISPATCH_DISPATCHER),
            get("id"),
            get(CAPTURED),
        ))
    }

    fn assemble(
        component: &mut Component, name: &str, root: &Path,
        config: serde_json::Value,
    ) -> Result<Arc<Application>> {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let config = AppConfig::from_value(config)?;
        Assembler::new(name, root, config)
            .executor("js", echo)
            .resource("page", |req: Request| {
                let error = req.attributes.get(ERROR).unwrap_or_default();
                Response::from_text(format!("page:{error}"))
            })
            .assemble(component)
    }

    fn get(component: &Component, path: &str) -> Response {
        component.handle(INTERNAL_HOST, Request::new().uri(path))
    }

    #[test]
    fn serves_static_files_behind_manual() {
        let root = fixture("manual");
        let mut component = Component::new();
        assemble(&mut component, "app", &root, json!({
            "routes": {
                "/*": ["manual", {
                    "type": "cacheControl",
                    "mediaTypes": { "text/css": "farFuture" },
                    "next": "static"
                }]
            }
        }))
        .unwrap();
        let res = get(&component, "/app/app.css");
        assert_eq!(res.body, b"body {}");
        let cache_control = res.headers.get(Header::CacheControl);
        assert_eq!(cache_control, Some("max-age=315360000"));
        let res = get(&component, "/app/person/");
        assert!(res.body.starts_with(b"person|"));
        assert_eq!(res.headers.get(Header::CacheControl), None);
    }

    #[test]
    fn dispatches_through_manual() {
        let root = fixture("dispatch");
        let mut component = Component::new();
        let app = assemble(&mut component, "app", &root, json!({
            "routes": { "/*": "manual", "/a/{id}/": "@lang:item" },
            "dispatchers": {
                "lang": { "resources": "/lang/", "strict": true }
            }
        }))
        .unwrap();
        let res = get(&component, "/app/a/42/");
        assert_eq!(res.body, b"dispatchers/lang|item|lang|42|/app/a/42/");
        let strict = app.globals().get("dispatcher.lang.strict");
        assert_eq!(strict, Some(&json!(true)));

        // Internal mount point is hidden from the outside
        let res = get(&component, "/app/_manual/dispatchers/lang/");
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn requires_manual_for_dispatch() {
        let root = fixture("required");
        let mut component = Component::new();
        let result = assemble(&mut component, "app", &root, json!({
            "routes": { "/a/{id}/": "@lang:item" }
        }));
        assert!(matches!(result, Err(Error::ManualRequired(_))));
        assert!(component.application("app").is_err());
    }

    #[test]
    fn rejects_conflicting_manuals() {
        let root = fixture("conflict");
        let mut component = Component::new();
        let result = assemble(&mut component, "app", &root, json!({
            "routes": {
                "/x/*": { "type": "manual", "root": "x" },
                "/y/*": { "type": "manual", "root": "y" }
            }
        }));
        let Err(Error::Route { uri, source }) = result else {
            panic!("expected error at route");
        };
        assert_eq!(uri, "/y/*");
        assert!(matches!(*source, Error::Singleton("manual")));
    }

    #[test]
    fn treats_shorthands_like_objects() {
        let root = fixture("shorthand");
        let mut component = Component::new();
        assemble(&mut component, "short", &root, json!({
            "routes": {
                "/s/": "!201",
                "/c/": "/s/",
                "/r/": ">/s/",
                "/h/": "!"
            }
        }))
        .unwrap();
        assemble(&mut component, "long", &root, json!({
            "routes": {
                "/s/": { "type": "status", "code": 201 },
                "/c/": { "type": "capture", "uri": "/s/" },
                "/r/": { "type": "redirect", "uri": "/s/" },
                "/h/": "hidden"
            }
        }))
        .unwrap();
        for path in ["/s/", "/c/", "/r/", "/h/"] {
            let short = get(&component, &format!("/short{path}"));
            let long = get(&component, &format!("/long{path}"));
            assert_eq!(short.status, long.status);
            assert_eq!(short.body, long.body);
        }
        let res = get(&component, "/short/c/");
        assert_eq!(res.status, Status::Created);
    }

    #[test]
    fn resolves_same_routes_to_same_behavior() {
        let root = fixture("idempotent");
        let config = json!({
            "routes": {
                "/*": ["manual", "static"],
                "/s/{id}/": "!201",
                "/c/": "/s/7/",
                "/r/": ">/s/1/",
                "/h/": "hidden"
            }
        });
        let mut component = Component::new();
        assemble(&mut component, "one", &root, config.clone()).unwrap();
        assemble(&mut component, "two", &root, config).unwrap();
        let paths = [
            "/person/", "/app.css", "/s/1/", "/c/", "/r/", "/h/", "/missing/",
        ];
        for path in paths {
            let one = get(&component, &format!("/one{path}"));
            let two = get(&component, &format!("/two{path}"));
            assert_eq!(one.status, two.status, "{path}");
            assert_eq!(one.body, two.body, "{path}");
            let location = |res: &Response, name: &str| {
                res.headers
                    .get(Header::Location)
                    .map(|location| location.replacen(name, "", 1))
            };
            assert_eq!(location(&one, "/one"), location(&two, "/two"));
        }
        let res = get(&component, "/one/person/");
        assert!(res.body.starts_with(b"person|"));
        assert_eq!(get(&component, "/two/c/").status, Status::Created);
    }

    #[test]
    fn renders_error_pages() {
        let root = fixture("errors");
        let mut component = Component::new();
        assemble(&mut component, "app", &root, json!({
            "routes": { "/errors/missing/": "$page" },
            "errors": { "404": "/errors/missing/!" }
        }))
        .unwrap();
        let res = get(&component, "/app/nowhere/");
        assert_eq!(res.status, Status::NotFound);
        assert_eq!(res.body, b"page:404");
        let res = get(&component, "/app/errors/missing/");
        assert_eq!(res.status, Status::NotFound);
        assert_eq!(res.body, b"page:404");
    }

    #[test]
    fn captures_into_other_applications() {
        let root = fixture("other");
        let mut component = Component::new();
        assemble(&mut component, "b", &root, json!({
            "routes": { "/y/": "$page" }
        }))
        .unwrap();
        assemble(&mut component, "a", &root, json!({
            "routes": {
                "/x/": { "type": "capture", "uri": "/y/", "application": "b" }
            }
        }))
        .unwrap();
        let res = get(&component, "/a/x/");
        assert_eq!(res.body, b"page:");
    }

    #[test]
    fn rejects_unknown_hosts() {
        let root = fixture("hosts");
        let mut component = Component::new();
        let result = assemble(&mut component, "app", &root, json!({
            "hosts": { "internal": "/app/", "elsewhere": "/" },
            "routes": { "/s/": "!201" }
        }));
        assert!(matches!(
            result,
            Err(Error::UnknownHost(host)) if host == "elsewhere"
        ));
        assert_eq!(get(&component, "/app/s/").status, Status::NotFound);
    }

    #[test]
    fn preheats_uris_in_order() {
        let root = fixture("preheat");
        let mut component = Component::new();
        let app = assemble(&mut component, "app", &root, json!({
            "routes": {
                "/s/": "!201",
                "/t/": "!202",
                "/u/": "!204",
                "/u/*": "hidden"
            },
            "preheat": ["/t/", "/missing/", "/s/", "/u/"]
        }))
        .unwrap();
        assert_eq!(app.preheat(), [
            Status::Accepted,
            Status::NotFound,
            Status::Created,
            Status::NoContent,
        ]);
        assert_eq!(get(&component, "/app/u/").status, Status::NotFound);
    }
}
