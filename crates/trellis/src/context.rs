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

//! Application context.

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use trellis_serve::handler::Handler;
use trellis_serve::handler::matcher::route::clean;
use trellis_serve::http::MediaTypes;
use trellis_serve::middleware::Compress;

use super::application::Applications;
use super::config::Dispatchers;
use super::descriptor::Descriptor;
use super::document::DocumentSource;
use super::executor::Registry;
use super::node::chain;
use super::node::manual::{ManualNode, TemplatesNode};
use super::node::{Node, Resolved};
use super::settings::Settings;
use super::{Error, Result};

mod dispatch;
mod slot;

pub use dispatch::{DispatchTable, Target, DEFAULT_DISPATCHER};
pub use slot::Slot;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Singleton node registration.
#[derive(Debug)]
struct Singleton<T> {
    /// First configuration.
    config: T,
    /// Slot standing in for the handler.
    slot: Slot,
}

/// Application context.
///
/// The context is threaded through the resolution of all descriptors of an
/// application, and holds the state that is shared between the nodes of an
/// application: settings, collaborators, the singleton manual and template
/// resources, the dispatch table, and the list of URIs to hide. It also
/// detects cycles between pre-built nodes, which would otherwise recurse
/// endlessly.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::context::Context;
/// use trellis::descriptor::Descriptor;
/// use trellis_serve::handler::Handler;
/// use trellis_serve::http::{Request, Status};
///
/// // Create context and resolve descriptor
/// let mut ctx = Context::new("app", ".");
/// let handler = ctx.resolve_handler(&"!204".parse::<Descriptor>()?, "/")?;
///
/// // Handle request
/// let res = handler.handle(Request::new());
/// assert_eq!(res.status, Status::NoContent);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Context {
    /// Application name.
    name: String,
    /// Application root directory.
    root: PathBuf,
    /// Application settings.
    settings: Arc<Settings>,
    /// Collaborators.
    registry: Arc<Registry>,
    /// Media types.
    media_types: MediaTypes,
    /// Library directories.
    library_paths: Arc<[PathBuf]>,
    /// Document sources of library directories.
    libraries: Arc<[DocumentSource]>,
    /// Time-to-live for chains without explicit one.
    chain_ttl: Option<Duration>,
    /// Manual resource.
    manual: Option<Singleton<ManualNode>>,
    /// Template resource.
    templates: Option<Singleton<TemplatesNode>>,
    /// Dispatch table.
    dispatch: DispatchTable,
    /// URIs to hide in the root router.
    hidden: Vec<String>,
    /// Root of the application, which is the target of captures.
    app: Slot,
    /// Applications of the component, for captures between applications.
    applications: Applications,
    /// Pre-built nodes currently being resolved, by URI and identity.
    stack: Vec<(String, usize)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Context {
    /// Creates a context for the application with the given name and root
    /// directory, using default settings.
    pub fn new<N, P>(name: N, root: P) -> Self
    where
        N: Into<String>,
        P: Into<PathBuf>,
    {
        let settings = Settings::default();
        let root = root.into();
        let (library_paths, libraries) = sources(&root, &settings);
        Self {
            name: name.into(),
            media_types: settings.media_types(),
            settings: Arc::new(settings),
            root,
            registry: Arc::default(),
            library_paths,
            libraries,
            chain_ttl: None,
            manual: None,
            templates: None,
            dispatch: DispatchTable::default(),
            hidden: Vec::new(),
            app: Slot::new(),
            applications: Applications::default(),
            stack: Vec::new(),
        }
    }

    /// Sets the application settings.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        let (library_paths, libraries) = sources(&self.root, &settings);
        self.media_types = settings.media_types();
        self.settings = Arc::new(settings);
        self.library_paths = library_paths;
        self.libraries = libraries;
        self
    }

    /// Sets the collaborators.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the dispatch table configuration.
    #[must_use]
    pub fn with_dispatchers(mut self, dispatchers: &Dispatchers) -> Self {
        self.dispatch = DispatchTable::new(dispatchers);
        self
    }

    /// Sets the applications of the component.
    #[must_use]
    pub fn with_applications(mut self, applications: Applications) -> Self {
        self.applications = applications;
        self
    }

    /// Resolves the given descriptor at the given URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor, or any nested descriptor, can't
    /// be resolved, or if a pre-built node is resolved within itself.
    pub fn resolve(
        &mut self, descriptor: &Descriptor, uri: &str,
    ) -> Result<Resolved> {
        match descriptor {
            Descriptor::Hidden => Ok(Resolved::Hidden),
            Descriptor::Chain(nodes) => {
                let ttl = self.chain_ttl();
                chain::build(self, uri, nodes, ttl)
            }
            Descriptor::Kind(kind) => kind.create(self, uri),
            Descriptor::Node(node) => {
                let id = Arc::as_ptr(node).cast::<()>().addr();
                let key = (uri.to_string(), id);
                if self.stack.contains(&key) {
                    return Err(Error::Cycle(uri.to_string()));
                }
                self.stack.push(key);
                let result = node.create(self, uri);
                self.stack.pop();
                result
            }
        }
    }

    /// Resolves the given descriptor at the given URI into a handler, which
    /// answers with "404 Not Found" if the descriptor is hidden.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor can't be resolved.
    pub fn resolve_handler(
        &mut self, descriptor: &Descriptor, uri: &str,
    ) -> Result<Arc<dyn Handler>> {
        self.resolve(descriptor, uri).map(Resolved::into_handler)
    }

    /// Registers the manual resource, returning the slot standing in for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Singleton`] if the manual resource was registered
    /// before with a different configuration.
    pub fn manual(&mut self, node: &ManualNode) -> Result<Slot> {
        singleton(&mut self.manual, node, "manual")
    }

    /// Registers the template resource, returning the slot standing in for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Singleton`] if the template resource was registered
    /// before with a different configuration.
    pub fn templates(&mut self, node: &TemplatesNode) -> Result<Slot> {
        singleton(&mut self.templates, node, "templates")
    }

    /// Returns the target of the given dispatcher, or of the default one.
    pub fn dispatcher(&mut self, name: Option<&str>) -> Target {
        self.dispatch.reference(name)
    }

    /// Hides the given URI in the root router, once the tree is built.
    pub fn hide<S>(&mut self, uri: S)
    where
        S: Into<String>,
    {
        self.hidden.push(uri.into());
    }

    /// Sets the time-to-live for chains without explicit one, returning the
    /// previous one.
    pub fn set_chain_ttl(&mut self, ttl: Option<Duration>) -> Option<Duration> {
        mem::replace(&mut self.chain_ttl, ttl)
    }

    /// Finishes the context after the handler tree is built, returning the
    /// internal URI of the manual resource and the slot standing in for it,
    /// if the manual resource is used.
    ///
    /// This builds the singleton resources, adding the documents of all
    /// referenced dispatchers to the pass-throughs of the manual resource,
    /// and binds the capture URIs of the dispatchers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManualRequired`] if dispatchers are referenced, but
    /// the manual resource is not used.
    pub fn finish(&mut self) -> Result<Option<(String, Slot)>> {
        let referenced: Vec<Target> =
            self.dispatch.referenced().cloned().collect();
        if let Some(templates) = &self.templates {
            let handler = templates.config.documents(self)?;
            templates.slot.bind(handler);
        }

        // Dispatch nodes capture into the manual resource
        let Some(manual) = &self.manual else {
            if referenced.is_empty() {
                return Ok(None);
            }
            return Err(Error::ManualRequired(self.name.clone()));
        };
        let internal = clean(manual.config.internal_uri());
        let mut config = manual.config.clone();
        for target in &referenced {
            let document = target.dispatcher.trim_matches('/').to_string();
            config.add_pass_through(document);
            let uri = clean(&format!("{internal}{}", target.dispatcher));
            let _ = target.uri.set(uri);
        }
        let handler = config.documents(self)?;
        manual.slot.bind(handler);
        Ok(Some((internal, manual.slot.clone())))
    }
}

#[allow(clippy::must_use_candidate)]
impl Context {
    /// Returns the application name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the application root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the given path against the application root directory.
    #[inline]
    pub fn path<P>(&self, path: P) -> PathBuf
    where
        P: AsRef<Path>,
    {
        self.root.join(path)
    }

    /// Returns the application settings.
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the collaborators.
    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the media types.
    #[inline]
    pub fn media_types(&self) -> &MediaTypes {
        &self.media_types
    }

    /// Returns the library directories.
    #[inline]
    pub fn library_paths(&self) -> &Arc<[PathBuf]> {
        &self.library_paths
    }

    /// Returns the document sources of the library directories.
    #[inline]
    pub fn libraries(&self) -> &Arc<[DocumentSource]> {
        &self.libraries
    }

    /// Returns the interval between checks whether source files changed.
    #[inline]
    pub fn validity(&self) -> Duration {
        self.settings.validity()
    }

    /// Returns the time-to-live for chains without explicit one.
    #[inline]
    pub fn chain_ttl(&self) -> Duration {
        self.chain_ttl.unwrap_or_else(|| self.validity())
    }

    /// Returns the compression middleware configured by the settings.
    pub fn compress(&self) -> Compress {
        let compression = &self.settings.compression;
        let threshold = usize::try_from(compression.size_threshold.0)
            .unwrap_or(usize::MAX);
        Compress::new(threshold).exclude(compression.exclude.iter())
    }

    /// Returns the slot standing in for the root of the application.
    #[inline]
    pub fn app(&self) -> &Slot {
        &self.app
    }

    /// Returns the applications of the component.
    #[inline]
    pub fn applications(&self) -> &Applications {
        &self.applications
    }

    /// Returns the dispatch table.
    #[inline]
    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Returns the URIs to hide in the root router.
    #[inline]
    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates the library directories and their document sources.
fn sources(
    root: &Path, settings: &Settings,
) -> (Arc<[PathBuf]>, Arc<[DocumentSource]>) {
    let paths = settings.libraries(root);
    let sources = paths
        .iter()
        .map(|path| {
            DocumentSource::new(path)
                .default_name(settings.code.default_document_name.as_str())
                .default_extension(settings.code.default_extension.as_str())
                .validity(settings.validity())
        })
        .collect();
    (paths.into(), sources)
}

/// Registers a singleton node, or reuses the existing registration if the
/// configuration is bare or identical.
fn singleton<T>(
    current: &mut Option<Singleton<T>>, config: &T, name: &'static str,
) -> Result<Slot>
where
    T: Clone + Default + PartialEq,
{
    match current {
        None => {
            let slot = Slot::new();
            let config = config.clone();
            *current = Some(Singleton { config, slot: slot.clone() });
            Ok(slot)
        }
        Some(existing)
            if *config == T::default() || *config == existing.config =>
        {
            Ok(existing.slot.clone())
        }
        Some(_) => Err(Error::Singleton(name)),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;
    use trellis_serve::http::{Request, Status};

    use super::*;

    /// Node resolving its own descriptor.
    struct Recursive(OnceLock<Descriptor>);

    impl Node for Recursive {
        fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
            match self.0.get() {
                Some(descriptor) => ctx.resolve(descriptor, uri),
                None => Ok(Resolved::Hidden),
            }
        }
    }

    fn manual(root: &str) -> ManualNode {
        serde_json::from_value(serde_json::json!({ "root": root })).unwrap()
    }

    #[test]
    fn detects_cycles() {
        let node = Arc::new(Recursive(OnceLock::new()));
        let descriptor = Descriptor::Node(node.clone());
        let _ = node.0.set(descriptor.clone());
        let mut ctx = Context::new("app", ".");
        let result = ctx.resolve(&descriptor, "/loop/");
        assert!(matches!(result, Err(Error::Cycle(uri)) if uri == "/loop/"));
    }

    #[test]
    fn reuses_singletons_with_equal_or_bare_configuration() {
        let mut ctx = Context::new("app", ".");
        assert!(ctx.manual(&manual("x")).is_ok());
        assert!(ctx.manual(&manual("x")).is_ok());
        assert!(ctx.manual(&ManualNode::default()).is_ok());
        assert!(matches!(
            ctx.manual(&manual("y")),
            Err(Error::Singleton("manual"))
        ));
    }

    #[test]
    fn requires_manual_for_dispatch() {
        let mut ctx = Context::new("app", ".");
        let _ = ctx.dispatcher(None);
        assert!(matches!(ctx.finish(), Err(Error::ManualRequired(_))));
    }

    #[test]
    fn binds_dispatcher_uris_below_manual() {
        let mut ctx = Context::new("app", ".");
        let slot = ctx.manual(&ManualNode::default()).unwrap();
        let target = ctx.dispatcher(Some("lua"));
        let (internal, _) = ctx.finish().unwrap().unwrap();
        assert_eq!(internal, "/_manual/");
        assert_eq!(
            target.uri.get().map(String::as_str),
            Some("/_manual/dispatchers/lua/")
        );
        assert!(slot.is_bound());
    }

    #[test]
    fn hidden_descriptors_resolve_to_not_found() {
        let mut ctx = Context::new("app", ".");
        let handler = ctx.resolve_handler(&Descriptor::Hidden, "/").unwrap();
        assert_eq!(handler.handle(Request::new()).status, Status::NotFound);
    }
}
