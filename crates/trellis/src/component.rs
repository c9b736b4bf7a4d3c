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

//! Component and virtual hosts.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use trellis_serve::handler::matcher::route::clean;
use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Request, Response, ResponseExt, Status, Uri};
use trellis_serve::middleware::BasePath;

use super::application::{Application, Applications};
use super::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Name of the default virtual host.
pub const DEFAULT_HOST: &str = "default";

/// Name of the internal virtual host.
pub const INTERNAL_HOST: &str = "internal";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Component.
///
/// A component is the outermost container, holding the virtual hosts that
/// applications are attached to, as well as the applications themselves, so
/// that captures can cross from one application into another. The default
/// and internal virtual hosts always exist.
///
/// # Examples
///
/// ```
/// use trellis::component::{Component, DEFAULT_HOST};
/// use trellis_serve::http::{Request, Status};
///
/// // Create component and handle request without applications
/// let component = Component::new();
/// let res = component.handle(DEFAULT_HOST, Request::new().uri("/"));
/// assert_eq!(res.status, Status::NotFound);
/// ```
pub struct Component {
    /// Virtual hosts by name.
    hosts: BTreeMap<String, VirtualHost>,
    /// Application registry, shared with captures.
    applications: Applications,
    /// Applications by name.
    registered: BTreeMap<String, Arc<Application>>,
}

/// Virtual host.
///
/// Handlers are attached at prefixes, and the longest prefix matching the
/// request path wins. Requests for a prefix without its trailing slash are
/// redirected to the prefix. The prefix is stripped from the request path
/// before the handler sees it.
#[derive(Default)]
pub struct VirtualHost {
    /// Mounts, longest prefix first.
    mounts: Vec<Mount>,
}

/// Handler attached at a prefix.
struct Mount {
    /// Prefix, with trailing slash.
    prefix: String,
    /// Handler, stripping the prefix.
    handler: Arc<dyn Handler>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Component {
    /// Creates a component with the default and internal virtual hosts.
    #[must_use]
    pub fn new() -> Self {
        let hosts = [DEFAULT_HOST, INTERNAL_HOST]
            .into_iter()
            .map(|name| (name.to_string(), VirtualHost::default()))
            .collect();
        Self {
            hosts,
            applications: Applications::default(),
            registered: BTreeMap::new(),
        }
    }

    /// Adds a virtual host, or returns the existing one with the given name.
    pub fn add_host<S>(&mut self, name: S) -> &mut VirtualHost
    where
        S: Into<String>,
    {
        self.hosts.entry(name.into()).or_default()
    }

    /// Handles the request with the given virtual host.
    ///
    /// Requests for unknown virtual hosts are answered with "404 Not Found".
    pub fn handle(&self, host: &str, req: Request) -> Response {
        match self.hosts.get(host) {
            Some(host) => host.handle(req),
            None => Response::from_status(Status::NotFound),
        }
    }

    /// Returns the application with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownApplication`] if there's no application with
    /// the given name.
    pub fn application(&self, name: &str) -> Result<Arc<Application>> {
        self.registered
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownApplication(name.to_string()))
    }

    /// Attaches the application to the given virtual hosts at the given
    /// prefixes, and registers it.
    pub(crate) fn attach(
        &mut self, hosts: &[(String, String)], app: &Arc<Application>,
    ) -> Result {
        let mut mounts = Vec::with_capacity(hosts.len());
        for (host, prefix) in hosts {
            if !self.hosts.contains_key(host) {
                return Err(Error::UnknownHost(host.clone()));
            }
            let handler = Arc::clone(app) as Arc<dyn Handler>;
            mounts.push((host, Mount::new(prefix, handler)?));
        }
        for (host, mount) in mounts {
            if let Some(host) = self.hosts.get_mut(host) {
                host.mount(mount);
            }
        }
        self.applications.insert(app);
        self.registered.insert(app.name().to_string(), Arc::clone(app));
        Ok(())
    }
}

#[allow(clippy::must_use_candidate)]
impl Component {
    /// Returns the virtual host with the given name.
    #[inline]
    pub fn host(&self, name: &str) -> Option<&VirtualHost> {
        self.hosts.get(name)
    }

    /// Returns the application registry.
    #[inline]
    pub fn applications(&self) -> &Applications {
        &self.applications
    }
}

// ----------------------------------------------------------------------------

impl VirtualHost {
    /// Attaches the handler at the given prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is not a valid route.
    pub fn attach(
        &mut self, prefix: &str, handler: Arc<dyn Handler>,
    ) -> Result {
        Mount::new(prefix, handler).map(|mount| self.mount(mount))
    }

    /// Adds the mount, keeping longer prefixes first.
    fn mount(&mut self, mount: Mount) {
        let index = self
            .mounts
            .partition_point(|other| other.prefix.len() >= mount.prefix.len());
        self.mounts.insert(index, mount);
    }
}

#[allow(clippy::must_use_candidate)]
impl VirtualHost {
    /// Returns the number of mounts.
    #[inline]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Returns whether there are no mounts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

impl Mount {
    /// Creates a mount stripping the given prefix.
    fn new(prefix: &str, handler: Arc<dyn Handler>) -> Result<Self> {
        let mut prefix = clean(prefix);
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        let base = BasePath::new(&prefix)?;
        let handler = Arc::new(Layer::new(base, handler));
        Ok(Self { prefix, handler })
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for VirtualHost {
    fn handle(&self, req: Request) -> Response {
        for mount in &self.mounts {
            if req.uri.path.starts_with(&mount.prefix) {
                return mount.handler.handle(req);
            }

            // Redirect to prefix with trailing slash
            let bare = mount.prefix.trim_end_matches('/');
            if !bare.is_empty() && req.uri.path == bare {
                let query = req.uri.query.as_deref();
                let location = Uri::from_parts(mount.prefix.as_str(), query);
                return Response::redirect(Status::MovedPermanently, location);
            }
        }
        Response::from_status(Status::NotFound)
    }
}

impl Default for Component {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Component")
            .field("hosts", &self.hosts.keys().collect::<Vec<_>>())
            .field("applications", &self.registered.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::http::Header;

    use super::*;

    fn echo(req: Request) -> Response {
        Response::from_text(format!("{}|{}", req.reference(), req.uri.path))
    }

    #[test]
    fn selects_longest_prefix() {
        let mut host = VirtualHost::default();
        host.attach("/", Arc::new(echo)).unwrap();
        host.attach("/blog", Arc::new(|_: Request| Status::Accepted)).unwrap();
        host.attach("/blog/admin/", Arc::new(echo)).unwrap();
        let res = host.handle(Request::new().uri("/blog/admin/users/"));
        assert_eq!(res.body, b"/blog/admin/users/|/users/");
        let res = host.handle(Request::new().uri("/blog/post/"));
        assert_eq!(res.status, Status::Accepted);
        let res = host.handle(Request::new().uri("/about/"));
        assert_eq!(res.body, b"/about/|/about/");
    }

    #[test]
    fn redirects_to_prefix_with_trailing_slash() {
        let mut host = VirtualHost::default();
        host.attach("/blog/", Arc::new(echo)).unwrap();
        let res = host.handle(Request::new().uri("/blog?page=2"));
        assert_eq!(res.status, Status::MovedPermanently);
        assert_eq!(res.headers.get(Header::Location), Some("/blog/?page=2"));
        let res = host.handle(Request::new().uri("/other/"));
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn adds_virtual_hosts() {
        let mut component = Component::new();
        let host = component.add_host("example.com");
        host.attach("/", Arc::new(echo)).unwrap();
        let host = component.host("example.com");
        assert_eq!(host.map(VirtualHost::len), Some(1));
        let res = component.handle("example.com", Request::new().uri("/a/"));
        assert_eq!(res.body, b"/a/|/a/");
        let res = component.handle("unknown", Request::new().uri("/a/"));
        assert_eq!(res.status, Status::NotFound);
        assert!(matches!(
            component.application("blog"),
            Err(Error::UnknownApplication(_))
        ));
    }
}
