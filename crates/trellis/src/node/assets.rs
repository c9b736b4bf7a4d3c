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

//! Asset pipeline nodes.

use dashmap::DashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use std::{fmt, fs, io};
use walkdir::WalkDir;

use tracing::{debug, error};
use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Request, Response};
use trellis_serve::middleware::Middleware;

use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::executor::{Compiler, Minifier};
use crate::{Error, Result};

use super::Resolved;

pub mod minify;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Transformation performed by an asset node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pipeline {
    /// Unification of all sources with the given extension.
    Unify(&'static str),
    /// Compilation of style sheets with the given compiler.
    Compile(&'static str),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Asset node, generating artifacts before the next node serves them.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssetNode {
    /// Source directories, the first one receiving the artifacts.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,
    /// Next node.
    pub next: Descriptor,
    /// Whether to minify `.min.` artifacts.
    #[serde(default = "default_minify")]
    pub minify: bool,
}

/// Middleware generating artifacts from sources.
///
/// Requests are matched against the naming conventions of the pipeline. For
/// unification, `all.<ext>` is the concatenation of all sources with the
/// extension in name order, and `all.min.<ext>` its minified form, while
/// `<name>.min.<ext>` is the minified form of `<name>.<ext>`. For compilation,
/// `<name>.css` is compiled from the source with the compiler's extension,
/// and `<name>.min.css` is its minified form.
///
/// Artifacts are written to the first source directory, and regenerated when
/// any of their sources is newer, checking at most once per validity interval.
/// The request is always forwarded to the next handler, which serves the
/// artifact, usually from static files.
pub struct Assets {
    /// Source directories.
    roots: Vec<PathBuf>,
    /// Transformation.
    pipeline: Pipeline,
    /// Compiler, for compilation.
    compiler: Option<Arc<dyn Compiler>>,
    /// Minifier, if enabled.
    minifier: Option<Arc<dyn Minifier>>,
    /// Interval between checks.
    validity: Duration,
    /// Last check by artifact.
    checked: DashMap<PathBuf, Instant>,
    /// Locks by artifact.
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

/// Artifact with its sources.
#[derive(Debug)]
struct Plan {
    /// Artifact path.
    artifact: PathBuf,
    /// Source paths.
    sources: Vec<PathBuf>,
    /// Whether to minify.
    minify: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl AssetNode {
    /// Creates the handler for the given pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compiler`] if no compiler is registered for the
    /// pipeline, or an error if the next node can't be resolved.
    pub fn build(
        &self, ctx: &mut Context, uri: &str, pipeline: Pipeline,
    ) -> Result<Resolved> {
        let registry = Arc::clone(ctx.registry());
        let (compiler, ext) = match pipeline {
            Pipeline::Unify(ext) => (None, ext),
            Pipeline::Compile(name) => match registry.compiler(name) {
                Some(compiler) => (Some(compiler), "css"),
                None => return Err(Error::Compiler(name.to_string())),
            },
        };
        let next = ctx.resolve_handler(&self.next, uri)?;
        let assets = Assets {
            roots: self.roots.iter().map(|root| ctx.path(root)).collect(),
            pipeline,
            compiler,
            minifier: self.minify.then(|| registry.minifier(ext)).flatten(),
            validity: ctx.validity(),
            checked: DashMap::new(),
            locks: DashMap::new(),
        };
        Ok(Resolved::handler(Layer::new(assets, next)))
    }
}

impl Assets {
    /// Returns the artifact and its sources for the given request path.
    fn plan(&self, path: &str) -> Option<Plan> {
        let relative = Path::new(path.trim_start_matches('/'));
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return None;
        }

        // Split file name into base name, minification marker and extension
        let file = relative.file_name()?.to_str()?;
        let parent = relative.parent().unwrap_or(Path::new(""));
        let (stem, ext) = file.rsplit_once('.')?;
        let (base, minify) = match stem.strip_suffix(".min") {
            Some(base) => (base, true),
            None => (stem, false),
        };
        if minify && self.minifier.is_none() {
            return None;
        }

        // Collect sources by naming convention
        let sources = match self.pipeline {
            Pipeline::Unify(kind) if ext == kind => {
                if base == "all" {
                    self.unified(parent, kind)
                } else if minify {
                    self.find(parent, &format!("{base}.{kind}"))
                } else {
                    return None;
                }
            }
            Pipeline::Compile(kind) if ext == "css" => {
                self.find(parent, &format!("{base}.{kind}"))
            }
            _ => return None,
        };
        let artifact = self.roots.first()?.join(relative);
        (!sources.is_empty()).then_some(Plan { artifact, sources, minify })
    }

    /// Finds the source with the given name in the first root having it.
    fn find(&self, parent: &Path, name: &str) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(parent).join(name))
            .find(|path| path.is_file())
            .into_iter()
            .collect()
    }

    /// Finds all sources with the given extension, in name order.
    fn unified(&self, parent: &Path, ext: &str) -> Vec<PathBuf> {
        let suffix = format!(".{ext}");
        let mut sources = BTreeMap::new();
        for root in &self.roots {
            let iter = WalkDir::new(root.join(parent))
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file());
            for entry in iter {
                let Some(name) = entry.file_name().to_str() else {
                    continue;
                };
                let excluded =
                    name.starts_with("all.") || name.contains(".min.");
                if name.ends_with(&suffix) && !excluded {
                    sources
                        .entry(name.to_string())
                        .or_insert_with(|| entry.path().to_path_buf());
                }
            }
        }
        sources.into_values().collect()
    }

    /// Regenerates the artifact if necessary, at most once per interval.
    fn refresh(&self, plan: &Plan) {
        let lock = Arc::clone(
            self.locks.entry(plan.artifact.clone()).or_default().value(),
        );
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let last = self.checked.get(&plan.artifact).map(|last| *last);
        if last.is_some_and(|last| last.elapsed() < self.validity) {
            return;
        }
        self.checked.insert(plan.artifact.clone(), Instant::now());
        if !is_stale(plan) {
            return;
        }
        match self.generate(plan) {
            Ok(()) => debug!("generated: {}", plan.artifact.display()),
            Err(err) => {
                let artifact = plan.artifact.display();
                error!("failed to generate {artifact}: {err}");
            }
        }
    }

    /// Generates the artifact from its sources.
    fn generate(&self, plan: &Plan) -> io::Result<()> {
        let mut content = String::new();
        for source in &plan.sources {
            let text = fs::read_to_string(source)?;
            let text = match &self.compiler {
                Some(compiler) => compiler.compile(&text)?,
                None => text,
            };
            content.push_str(&text);
            if !content.ends_with('\n') {
                content.push('\n');
            }
        }
        if let (true, Some(minifier)) = (plan.minify, &self.minifier) {
            content = minifier.minify(&content);
        }
        if let Some(parent) = plan.artifact.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&plan.artifact, content)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for Assets {
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        if let Some(plan) = self.plan(&req.uri.path) {
            self.refresh(&plan);
        }
        next.handle(req)
    }
}

impl fmt::Debug for Assets {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Assets")
            .field("roots", &self.roots)
            .field("pipeline", &self.pipeline)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether any source is newer than the artifact.
fn is_stale(plan: &Plan) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified());
    let Ok(artifact) = modified(&plan.artifact) else {
        return true;
    };
    plan.sources.iter().any(|source| {
        modified(source).map_or(true, |source| source > artifact)
    })
}

/// Returns the default source directories.
fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("resources")]
}

/// Returns the default for minification.
fn default_minify() -> bool {
    true
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::fs::File;
    use std::time::SystemTime;
    use std::{env, process};

    use crate::executor::Registry;
    use crate::settings::{Interval, Settings};
    use trellis_serve::http::Status;

    use super::*;

    fn context(name: &str, registry: Registry) -> Context {
        let root = env::temp_dir()
            .join(format!("trellis-assets-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("resources/scripts")).unwrap();
        let scripts = root.join("resources/scripts");
        fs::write(scripts.join("b.js"), "var b = 2;\n").unwrap();
        fs::write(scripts.join("a.js"), "var a = 1; // one\n").unwrap();
        let less = root.join("resources/site.less");
        fs::write(less, "a { color: @c; }").unwrap();
        let mut settings = Settings::default();
        settings.code.minimum_time_between_validity_checks =
            Interval(Duration::ZERO);
        Context::new("app", root)
            .with_settings(settings)
            .with_registry(Arc::new(registry))
    }

    fn handler(
        ctx: &mut Context, pipeline: Pipeline, config: serde_json::Value,
    ) -> Arc<dyn Handler> {
        let node: AssetNode = serde_json::from_value(config).unwrap();
        node.build(ctx, "/*", pipeline).unwrap().into_handler()
    }

    fn get(handler: &Arc<dyn Handler>, path: &str) -> Response {
        handler.handle(Request::new().uri(path))
    }

    #[test]
    fn unifies_and_minifies_sources() {
        let mut ctx = context("unify", Registry::default());
        let config = json!({ "next": "static" });
        let handler = handler(&mut ctx, Pipeline::Unify("js"), config);
        let res = get(&handler, "/scripts/all.js");
        assert_eq!(res.body, b"var a = 1; // one\nvar b = 2;\n");
        let res = get(&handler, "/scripts/all.min.js");
        assert_eq!(res.body, b"var a = 1;\nvar b = 2;\n");
        let res = get(&handler, "/scripts/a.min.js");
        assert_eq!(res.body, b"var a = 1;\n");
    }

    #[test]
    fn regenerates_only_when_sources_are_newer() {
        let mut ctx = context("stale", Registry::default());
        let config = json!({ "next": "static", "minify": false });
        let handler = handler(&mut ctx, Pipeline::Unify("js"), config);
        let artifact = ctx.path("resources/scripts/all.js");
        assert_eq!(get(&handler, "/scripts/all.js").status, Status::Ok);

        // Artifact is kept while it's newer than its sources
        fs::write(&artifact, "edited").unwrap();
        assert_eq!(get(&handler, "/scripts/all.js").body, b"edited");
        let future = SystemTime::now() + Duration::from_secs(60);
        let source = ctx.path("resources/scripts/b.js");
        File::options()
            .write(true)
            .open(source)
            .and_then(|file| file.set_modified(future))
            .unwrap();
        let res = get(&handler, "/scripts/all.js");
        assert_eq!(res.body, b"var a = 1; // one\nvar b = 2;\n");

        // Minification is disabled, so minified names are not generated
        let res = get(&handler, "/scripts/a.min.js");
        assert_eq!(res.status, Status::NotFound);
    }

    #[test]
    fn compiles_style_sheets() {
        let mut registry = Registry::default();
        registry.add_compiler("less", |source: &str| -> io::Result<String> {
            Ok(source.replace("@c", "red"))
        });
        let mut ctx = context("compile", registry);
        let config = json!({ "next": "static" });
        let handler = handler(&mut ctx, Pipeline::Compile("less"), config);
        let res = get(&handler, "/site.css");
        assert_eq!(res.body, b"a { color: red; }\n");
        assert_eq!(get(&handler, "/other.css").status, Status::NotFound);
    }

    #[test]
    fn requires_registered_compiler() {
        let mut ctx = context("compiler", Registry::default());
        let node: AssetNode =
            serde_json::from_value(json!({ "next": "static" })).unwrap();
        let result = node.build(&mut ctx, "/*", Pipeline::Compile("zuss"));
        assert!(matches!(result, Err(Error::Compiler(name)) if name == "zuss"));
    }
}
