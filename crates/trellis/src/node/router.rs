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

//! Router node.

use serde::Deserialize;
use std::cmp::Reverse;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;
use trellis_serve::handler::matcher::route::clean;
use trellis_serve::handler::matcher::{Matching, Route, REMAINDER};
use trellis_serve::handler::{Handler, Matcher};
use trellis_serve::http::{Request, Response, ResponseExt, Status};

use crate::attribute::{self, BASE};
use crate::config::Routes;
use crate::context::Context;
use crate::settings::Interval;
use crate::{Error, Result};

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Routing mode, selecting among several matching routes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingMode {
    /// Most specific route.
    #[default]
    Best,
    /// First declared route.
    First,
    /// Last declared route.
    Last,
    /// Random route, chosen per request.
    Random,
    /// Routes in rotation.
    Next,
    /// Custom scoring, which can't be expressed in configuration.
    Custom,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Router node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouterNode {
    /// Routes by URI template.
    #[serde(default)]
    pub routes: Routes,
    /// Routing mode.
    #[serde(default)]
    pub routing_mode: RoutingMode,
    /// Time-to-live for chains created directly below the router.
    #[serde(default)]
    pub cache_duration: Option<Interval>,
}

/// Router entry.
struct Entry {
    /// Route.
    route: Route,
    /// Matcher for the route.
    matcher: Matcher,
    /// Handler.
    handler: Arc<dyn Handler>,
}

/// Router.
///
/// The router matches the request path against the URI templates of all of
/// its routes. Templates ending in `*` match the template itself and every
/// path below it, and expose the unmatched remainder as the `rr` variable.
/// If several routes match, the routing mode decides, which, in the default
/// mode, selects the most specific route: exact routes outrank prefix routes,
/// then fewer variables outrank more variables, then longer literal text wins,
/// and finally, the route declared first wins.
///
/// Variables of the selected route are written to the request attributes.
/// For prefix routes, the matched prefix is moved from the request path to
/// the base of the request, so the handler sees the remainder as its path.
///
/// Hidden routes are never matched for requests from the outside, but are
/// still matched for requests captured internally.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use std::sync::Arc;
/// use trellis::node::router::{Router, RoutingMode};
/// use trellis_serve::handler::Handler;
/// use trellis_serve::http::{Request, Response, ResponseExt, Status};
///
/// // Create router with a templated route
/// let mut router = Router::new(RoutingMode::Best);
/// router.attach(
///     "/coffee/{kind}/".parse()?,
///     Arc::new(|req: Request| {
///         let kind = req.attributes.get("kind").unwrap_or_default();
///         Response::from_text(kind.to_string())
///     }),
/// )?;
///
/// // Handle request
/// let res = router.handle(Request::new().uri("/coffee/arabica/"));
/// assert_eq!(res.body, b"arabica");
/// # Ok(())
/// # }
/// ```
pub struct Router {
    /// Routes in declaration order.
    entries: Vec<Entry>,
    /// Hidden routes.
    hidden: Vec<(Route, Matcher)>,
    /// Routing mode.
    mode: RoutingMode,
    /// Rotation counter.
    counter: AtomicUsize,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl RouterNode {
    /// Builds the router.
    ///
    /// # Errors
    ///
    /// Returns an error if the routing mode is not supported, or a route is
    /// invalid or can't be resolved. Errors of routes carry their URI.
    pub fn build(&self, ctx: &mut Context, uri: &str) -> Result<Router> {
        if self.routing_mode == RoutingMode::Custom {
            let mode = String::from("custom routing mode");
            return Err(Error::Unsupported(mode));
        }

        // Chains directly below the router inherit its time-to-live
        let previous = self
            .cache_duration
            .map(|interval| ctx.set_chain_ttl(Some(interval.0)));
        let mut router = Router::new(self.routing_mode);
        let result = self.attach(ctx, uri, &mut router);
        if let Some(previous) = previous {
            ctx.set_chain_ttl(previous);
        }
        result.map(|()| router)
    }

    /// Resolves and attaches all routes to the given router.
    fn attach(
        &self, ctx: &mut Context, uri: &str, router: &mut Router,
    ) -> Result {
        let base = uri.trim_end_matches('*');
        for (key, descriptor) in &self.routes {
            let key = clean(key);
            let full = clean(&format!("{base}/{key}"));
            let route = key
                .parse::<Route>()
                .map_err(|err| Error::from(err).at(&full))?;
            let resolved = ctx
                .resolve(descriptor, &full)
                .map_err(|err| err.at(&full))?;
            match resolved {
                Resolved::Hidden => router.hide(route),
                Resolved::Handler(handler) => router
                    .attach(route, handler)
                    .map_err(|err| err.at(&full))?,
            }
            debug!("\"{full}\" -> {}", descriptor.name());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------

impl Router {
    /// Creates a router.
    #[must_use]
    pub fn new(mode: RoutingMode) -> Self {
        Self {
            entries: Vec::new(),
            hidden: Vec::new(),
            mode,
            counter: AtomicUsize::new(0),
        }
    }

    /// Attaches a handler to the given route.
    ///
    /// # Errors
    ///
    /// Returns an error if the route can't be matched.
    pub fn attach(
        &mut self, route: Route, handler: Arc<dyn Handler>,
    ) -> Result {
        let mut matcher = Matcher::new();
        matcher.add(&route, ())?;
        self.entries.push(Entry { route, matcher, handler });
        Ok(())
    }

    /// Hides the given route from requests from the outside.
    pub fn hide(&mut self, route: Route) {
        if self.hidden.iter().any(|(hidden, _)| *hidden == route) {
            return;
        }
        let mut matcher = Matcher::new();
        if matcher.add(&route, ()).is_ok() {
            self.hidden.push((route, matcher));
        }
    }

    /// Returns whether the given path is hidden.
    fn is_hidden(&self, path: &str) -> bool {
        self.hidden
            .iter()
            .any(|(_, matcher)| matcher.resolve(path).is_some())
    }

    /// Selects one of the given matching entries.
    fn select(&self, matches: &[usize]) -> usize {
        match self.mode {
            RoutingMode::Best | RoutingMode::Custom => {
                let rank = |&index: &usize| {
                    let route = &self.entries[index].route;
                    (
                        route.matching() == Matching::StartsWith,
                        route.variables().count(),
                        Reverse(route.literal_len()),
                        index,
                    )
                };
                matches.iter().copied().min_by_key(rank).unwrap_or(matches[0])
            }
            RoutingMode::First => matches[0],
            RoutingMode::Last => matches[matches.len() - 1],
            RoutingMode::Random => matches[fastrand::usize(..matches.len())],
            RoutingMode::Next => {
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                matches[count % matches.len()]
            }
        }
    }
}

#[allow(clippy::must_use_candidate)]
impl Router {
    /// Returns the number of routes.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no routes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for RouterNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        self.build(ctx, uri).map(Resolved::handler)
    }

    fn name(&self) -> &str {
        "router"
    }
}

// ----------------------------------------------------------------------------

impl Handler for Router {
    fn handle(&self, mut req: Request) -> Response {
        let path = req.uri.path.clone();
        if !attribute::is_internal(&req) && self.is_hidden(&path) {
            return Response::from_status(Status::NotFound);
        }

        // Collect matching entries, and select one of them
        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matcher.resolve(&path).is_some())
            .map(|(index, _)| index)
            .collect();
        let index = match matches.len() {
            0 => return Response::from_status(Status::NotFound),
            1 => matches[0],
            _ => self.select(&matches),
        };

        // Write variables to request attributes
        let entry = &self.entries[index];
        let Some(matched) = entry.matcher.resolve(&path) else {
            return Response::from_status(Status::NotFound);
        };
        let remainder = matched.params.remainder().unwrap_or_default();
        for (key, value) in &matched.params {
            req.attributes.insert(key, value);
        }

        // Move matched prefix from path to base on segment boundaries
        if entry.route.matching() == Matching::StartsWith {
            if let Some(prefix) = path.strip_suffix(remainder) {
                let (prefix, rest) = match prefix.strip_suffix('/') {
                    Some(prefix) => (prefix, format!("/{remainder}")),
                    None => (prefix, remainder.to_string()),
                };
                if rest.is_empty() || rest.starts_with('/') {
                    if !prefix.is_empty() {
                        let base =
                            req.attributes.get(BASE).unwrap_or_default();
                        let base =
                            format!("{}{prefix}", base.trim_end_matches('/'));
                        req.attributes.insert(BASE, base);
                    }
                    req.uri.path = rest;
                }
            }
        }
        entry.handler.handle(req)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let routes: Vec<_> =
            self.entries.iter().map(|entry| entry.route.to_string()).collect();
        f.debug_struct("Router")
            .field("routes", &routes)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::attribute::HISTORY;

    use super::*;

    fn router(config: serde_json::Value) -> Router {
        let node: RouterNode = serde_json::from_value(config).unwrap();
        let mut ctx = Context::new("app", ".");
        node.build(&mut ctx, "/").unwrap()
    }

    fn get(router: &Router, path: &str) -> Response {
        router.handle(Request::new().uri(path))
    }

    #[test]
    fn prefers_exact_over_templated_routes() {
        let router = router(json!({
            "routes": {
                "/a/{id}/": "!202",
                "/a/b/": "!201",
                "/a/*": "!206"
            }
        }));
        assert_eq!(get(&router, "/a/b/").status, Status::Created);
        assert_eq!(get(&router, "/a/c/").status, Status::Accepted);
        assert_eq!(get(&router, "/a/c/d").status, Status::PartialContent);
    }

    #[test]
    fn breaks_ties_by_declaration_order() {
        let router = router(json!({
            "routes": { "/{a}/": "!201", "/{b}/": "!202" }
        }));
        assert_eq!(get(&router, "/x/").status, Status::Created);
    }

    #[test]
    fn selects_first_and_last() {
        let routes = json!({ "/{a}/": "!201", "/x/": "!202" });
        let first = router(json!({ "routes": routes, "routingMode": "first" }));
        assert_eq!(get(&first, "/x/").status, Status::Created);
        let last = router(json!({ "routes": routes, "routingMode": "last" }));
        assert_eq!(get(&last, "/x/").status, Status::Accepted);
    }

    #[test]
    fn rotates_in_next_mode() {
        let router = router(json!({
            "routes": { "/{a}/": "!201", "/{b}/": "!202", "/{c}/": "!204" },
            "routingMode": "next"
        }));
        let statuses: Vec<_> =
            (0..6).map(|_| get(&router, "/x/").status.code()).collect();
        assert_eq!(statuses, [201, 202, 204, 201, 202, 204]);
    }

    #[test]
    fn chooses_among_matches_in_random_mode() {
        let router = router(json!({
            "routes": { "/{a}/": "!201", "/{b}/": "!202" },
            "routingMode": "random"
        }));
        for _ in 0..10 {
            let code = get(&router, "/x/").status.code();
            assert!(code == 201 || code == 202);
        }
    }

    #[test]
    fn writes_variables_and_moves_prefix_to_base() {
        let node: RouterNode = serde_json::from_value(json!({
            "routes": { "/users/{id}/*": "!200" }
        }))
        .unwrap();
        let mut ctx = Context::new("app", ".");
        let mut router = node.build(&mut ctx, "/").unwrap();
        router
            .attach(
                "/echo/*".parse().unwrap(),
                Arc::new(|req: Request| {
                    let base = req.attributes.get(BASE).unwrap_or_default();
                    let rr = req.attributes.get(REMAINDER).unwrap_or_default();
                    Response::from_text(format!("{base}|{}|{rr}", req.uri.path))
                }),
            )
            .unwrap();
        let res = get(&router, "/echo/a/b");
        assert_eq!(res.body, b"/echo|/a/b|a/b");
        let res = get(&router, "/echo/");
        assert_eq!(res.body, b"/echo|/|");
    }

    #[test]
    fn hides_routes_from_outside() {
        let router = router(json!({
            "routes": { "/secret/": "!200", "/secret/*": "hidden" }
        }));
        assert_eq!(get(&router, "/secret/").status, Status::NotFound);
        let req = Request::new().uri("/secret/").attribute(HISTORY, "/secret/");
        assert_eq!(router.handle(req).status, Status::Ok);
    }

    #[test]
    fn matches_literal_prefixes() {
        let router = router(json!({ "routes": { "/static*": "!201" } }));
        assert_eq!(get(&router, "/staticfiles/x.css").status, Status::Created);
        assert_eq!(get(&router, "/static/x.css").status, Status::Created);
        assert_eq!(get(&router, "/static").status, Status::Created);
        assert_eq!(get(&router, "/stat").status, Status::NotFound);
    }

    #[test]
    fn moves_literal_prefix_to_base_on_segment_boundaries() {
        let mut router = router(json!({}));
        router
            .attach(
                "/static*".parse().unwrap(),
                Arc::new(|req: Request| {
                    let base = req.attributes.get(BASE).unwrap_or_default();
                    let rr = req.attributes.get(REMAINDER).unwrap_or_default();
                    Response::from_text(format!("{base}|{}|{rr}", req.uri.path))
                }),
            )
            .unwrap();
        let res = get(&router, "/static/x.css");
        assert_eq!(res.body, b"/static|/x.css|/x.css");
        let res = get(&router, "/staticfiles/x.css");
        assert_eq!(res.body, b"|/staticfiles/x.css|files/x.css");
    }

    #[test]
    fn hides_literal_prefixes() {
        let mut router = router(json!({
            "routes": { "/secrets/": "!200", "/public/": "!200" }
        }));
        router.hide("/secret*".parse().unwrap());
        assert_eq!(get(&router, "/secrets/").status, Status::NotFound);
        assert_eq!(get(&router, "/public/").status, Status::Ok);
        let req = Request::new().uri("/secrets/").attribute(HISTORY, "/x/");
        assert_eq!(router.handle(req).status, Status::Ok);
    }

    #[test]
    fn reports_route_of_nested_errors() {
        let node: RouterNode = serde_json::from_value(json!({
            "routes": {
                "/a/*": { "type": "router", "routes": { "/b/": "!299" } }
            }
        }))
        .unwrap();
        let mut ctx = Context::new("app", ".");
        let result = node.build(&mut ctx, "/");
        assert!(matches!(
            result,
            Err(Error::Route { uri, .. }) if uri == "/a/b/"
        ));
    }

    #[test]
    fn rejects_custom_mode() {
        let node: RouterNode =
            serde_json::from_value(json!({ "routingMode": "custom" })).unwrap();
        let mut ctx = Context::new("app", ".");
        let result = node.build(&mut ctx, "/");
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
