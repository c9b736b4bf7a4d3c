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

//! Collaborators executing documents and compiling assets.
//!
//! The engine only decides which document handles a request. Executing the
//! document in its language, compiling style sheet dialects or minifying
//! assets are left to collaborators registered with the assembler, which
//! are looked up by extension or name.

use ahash::AHashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use trellis_serve::handler::Handler;
use trellis_serve::http::{Request, Response};

use super::document::Document;
use super::node::assets::minify::Builtin;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Purpose of a document invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    /// Manual resource, implementing request handling entry points.
    Manual,
    /// Template resource, rendering a response.
    Template,
    /// Filter, running before and after the next handler.
    Filter,
}

/// Outcome of a filter's entry point before the next handler.
#[derive(Debug)]
pub enum Flow {
    /// Continue with the next handler.
    Continue,
    /// Stop, answering with the given response.
    Stop(Response),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Document invocation.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// Document to execute.
    pub document: Document,
    /// Purpose of the invocation.
    pub purpose: Purpose,
    /// Library directories.
    pub libraries: Arc<[PathBuf]>,
    /// Include directories for templates.
    pub includes: Arc<[PathBuf]>,
    /// Language tag assumed for the document.
    pub language: String,
}

/// Registry of collaborators.
///
/// Executors are registered by document extension, compilers by the name of
/// the node type using them, minifiers by asset extension, and resources,
/// which are handlers implemented in code, by name.
///
/// # Examples
///
/// ```
/// use trellis::executor::Registry;
/// use trellis_serve::http::{Request, Response, ResponseExt};
///
/// // Create registry with resource
/// let mut registry = Registry::default();
/// registry.add_resource("hello", |_: Request| Response::from_text("Hello"));
/// assert!(registry.resource("hello").is_some());
/// assert!(registry.minifier("js").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    /// Executors by extension.
    executors: AHashMap<String, Arc<dyn Executor>>,
    /// Compilers by name.
    compilers: AHashMap<String, Arc<dyn Compiler>>,
    /// Minifiers by extension.
    minifiers: AHashMap<String, Arc<dyn Minifier>>,
    /// Resources by name.
    resources: AHashMap<String, Arc<dyn Handler>>,
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Document executor.
///
/// Executors run documents in the language they're written in. A response
/// with "404 Not Found" signals that the document doesn't handle the given
/// request, while "5xx" responses signal errors.
pub trait Executor: Send + Sync + 'static {
    /// Executes the document to handle the given request.
    fn handle(&self, invocation: &Invocation, req: Request) -> Response;

    /// Executes the entry point of a filter before the next handler.
    fn before(&self, _invocation: &Invocation, _req: &mut Request) -> Flow {
        Flow::Continue
    }

    /// Executes the entry point of a filter after the next handler.
    fn after(&self, _invocation: &Invocation, _res: &mut Response) {}
}

/// Style sheet compiler.
pub trait Compiler: Send + Sync + 'static {
    /// Compiles the given source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source can't be compiled.
    fn compile(&self, source: &str) -> io::Result<String>;
}

/// Asset minifier.
pub trait Minifier: Send + Sync + 'static {
    /// Minifies the given source.
    fn minify(&self, source: &str) -> String;
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Registry {
    /// Registers an executor for the given extension.
    pub fn add_executor<E>(&mut self, ext: &str, executor: E)
    where
        E: Executor,
    {
        self.executors.insert(ext.to_ascii_lowercase(), Arc::new(executor));
    }

    /// Registers a compiler under the given name.
    pub fn add_compiler<C>(&mut self, name: &str, compiler: C)
    where
        C: Compiler,
    {
        self.compilers.insert(name.to_string(), Arc::new(compiler));
    }

    /// Registers a minifier for the given extension.
    pub fn add_minifier<M>(&mut self, ext: &str, minifier: M)
    where
        M: Minifier,
    {
        self.minifiers.insert(ext.to_ascii_lowercase(), Arc::new(minifier));
    }

    /// Registers a resource under the given name.
    pub fn add_resource<H>(&mut self, name: &str, handler: H)
    where
        H: Handler,
    {
        self.resources.insert(name.to_string(), Arc::new(handler));
    }

    /// Returns the executor for the given extension.
    #[must_use]
    pub fn executor(&self, ext: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(&ext.to_ascii_lowercase()).cloned()
    }

    /// Returns the compiler registered under the given name.
    #[must_use]
    pub fn compiler(&self, name: &str) -> Option<Arc<dyn Compiler>> {
        self.compilers.get(name).cloned()
    }

    /// Returns the minifier for the given extension, falling back to the
    /// built-in minifiers for scripts and style sheets.
    #[must_use]
    pub fn minifier(&self, ext: &str) -> Option<Arc<dyn Minifier>> {
        let ext = ext.to_ascii_lowercase();
        self.minifiers.get(&ext).cloned().or_else(|| {
            Builtin::for_extension(&ext)
                .map(|builtin| Arc::new(builtin) as Arc<dyn Minifier>)
        })
    }

    /// Returns the resource registered under the given name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.resources.get(name).cloned()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut executors: Vec<_> = self.executors.keys().collect();
        executors.sort();
        let mut resources: Vec<_> = self.resources.keys().collect();
        resources.sort();
        f.debug_struct("Registry")
            .field("executors", &executors)
            .field("resources", &resources)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F, R> Executor for F
where
    F: Fn(&Invocation, Request) -> R + Send + Sync + 'static,
    R: Into<Response>,
{
    #[inline]
    fn handle(&self, invocation: &Invocation, req: Request) -> Response {
        self(invocation, req).into()
    }
}

impl<F> Compiler for F
where
    F: Fn(&str) -> io::Result<String> + Send + Sync + 'static,
{
    #[inline]
    fn compile(&self, source: &str) -> io::Result<String> {
        self(source)
    }
}

impl<F> Minifier for F
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    #[inline]
    fn minify(&self, source: &str) -> String {
        self(source)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::http::ResponseExt;

    use crate::context::Context;

    use super::*;

    #[test]
    fn formats_registered_names() {
        let mut registry = Registry::default();
        registry.add_executor("js", |_: &Invocation, _: Request| {
            Response::from_text("")
        });
        registry.add_resource("hello", |_: Request| Response::from_text(""));
        let debug = format!("{registry:?}");
        assert!(debug.starts_with("Registry"));
        assert!(debug.contains("\"js\"") && debug.contains("\"hello\""));
        let ctx = Context::new("app", ".").with_registry(Arc::new(registry));
        assert!(format!("{ctx:?}").contains("Registry"));
    }
}
