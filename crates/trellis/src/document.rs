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

//! Document sources.

use dashmap::DashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Number of cached lookups after which expired ones are swept.
const SWEEP_INTERVAL: usize = 256;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Logical name, e.g. `person/list`.
    pub name: String,
    /// Path to the file.
    pub path: PathBuf,
    /// Extension, which selects the executor.
    pub extension: String,
    /// Modification time.
    pub modified: Option<SystemTime>,
}

/// Document source.
///
/// A document source maps logical names, which are usually request paths,
/// to documents in a root directory. Documents can be marked with a token
/// before their extension, which tells manual resources from template
/// resources in a shared directory. For example, with the token `m`, the
/// name `/a/b/` maps to one of the following files, the first one found:
///
/// - `a/b.m.<ext>`
/// - `a/b/<default>.m.<ext>`
///
/// Files with the default extension are preferred over other files. Lookups
/// are cached for the validity interval, after which the file system is
/// consulted again, so new, moved or deleted documents are picked up. Expired
/// lookups are swept periodically.
///
/// # Examples
///
/// ```no_run
/// use trellis::document::DocumentSource;
///
/// // Create document source for manual resources
/// let source = DocumentSource::new("resources")
///     .pre_extension(Some("m"))
///     .default_name("default")
///     .default_extension("js");
///
/// // Find document for request path
/// if let Some(document) = source.find("/person/list/") {
///     println!("{}", document.path.display());
/// }
/// ```
#[derive(Debug)]
pub struct DocumentSource {
    /// Root directory.
    root: PathBuf,
    /// Token before the extension.
    pre_extension: Option<String>,
    /// Document name for directories.
    default_name: String,
    /// Preferred extension.
    default_extension: String,
    /// Validity interval of cached lookups.
    validity: Duration,
    /// Cached lookups.
    cache: DashMap<String, (Option<Document>, Instant)>,
    /// Lookups cached since the last sweep.
    inserts: AtomicUsize,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl DocumentSource {
    /// Creates a document source for the given root directory.
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            pre_extension: None,
            default_name: String::from("default"),
            default_extension: String::from("js"),
            validity: Duration::ZERO,
            cache: DashMap::new(),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Sets the token before the extension.
    #[must_use]
    pub fn pre_extension(mut self, token: Option<&str>) -> Self {
        self.pre_extension = token
            .filter(|token| !token.is_empty())
            .map(ToString::to_string);
        self
    }

    /// Sets the document name for directories.
    #[must_use]
    pub fn default_name<S>(mut self, name: S) -> Self
    where
        S: Into<String>,
    {
        self.default_name = name.into();
        self
    }

    /// Sets the preferred extension.
    #[must_use]
    pub fn default_extension<S>(mut self, ext: S) -> Self
    where
        S: Into<String>,
    {
        self.default_extension = ext.into();
        self
    }

    /// Sets the validity interval of cached lookups.
    #[must_use]
    pub fn validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds the document for the given name.
    pub fn find(&self, name: &str) -> Option<Document> {
        let name = name.trim_matches('/');
        if !self.validity.is_zero() {
            if let Some(entry) = self.cache.get(name) {
                let (document, checked) = entry.value();
                if checked.elapsed() < self.validity {
                    return document.clone();
                }
            }
        }

        // Consult file system and remember outcome
        let document = self.lookup(name);
        if !self.validity.is_zero() {
            let entry = (document.clone(), Instant::now());
            self.cache.insert(name.to_string(), entry);
            let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
            if inserts % SWEEP_INTERVAL == 0 {
                let validity = self.validity;
                self.cache.retain(|_, (_, checked)| {
                    checked.elapsed() < validity
                });
            }
        }
        document
    }

    /// Looks up the document for the given name in the file system.
    fn lookup(&self, name: &str) -> Option<Document> {
        let relative = Path::new(name);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return None;
        }

        // Try the name as a file, then as a directory with default document
        let mut candidates = Vec::with_capacity(2);
        if let Some(base) = relative.file_name().and_then(|base| base.to_str()) {
            let parent = relative.parent().unwrap_or(Path::new(""));
            candidates.push((self.root.join(parent), base));
        }
        candidates.push((self.root.join(relative), self.default_name.as_str()));
        candidates
            .into_iter()
            .find_map(|(dir, base)| self.find_in(&dir, base))
            .map(|(path, extension)| Document {
                name: name.to_string(),
                modified: fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .ok(),
                path,
                extension,
            })
    }

    /// Finds a file with the given base name in the given directory.
    fn find_in(&self, dir: &Path, base: &str) -> Option<(PathBuf, String)> {
        let prefix = match &self.pre_extension {
            Some(token) => format!("{base}.{token}."),
            None => format!("{base}."),
        };

        // Prefer the default extension
        let preferred = dir.join(format!("{prefix}{}", self.default_extension));
        if preferred.is_file() {
            return Some((preferred, self.default_extension.clone()));
        }

        // Otherwise, take the first file in name order with any extension
        let mut found = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                let ext = file_name.strip_prefix(&prefix)?;
                let valid = !ext.is_empty() && !ext.contains('.');
                (valid && entry.path().is_file())
                    .then(|| (entry.path(), ext.to_string()))
            })
            .collect::<Vec<_>>();
        found.sort();
        found.into_iter().next()
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
            .join(format!("trellis-document-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("person")).unwrap();
        fs::write(dir.join("person.m.js"), "person").unwrap();
        fs::write(dir.join("person/default.m.py"), "list").unwrap();
        fs::write(dir.join("default.m.js"), "index").unwrap();
        fs::write(dir.join("about.t.html"), "about").unwrap();
        dir
    }

    #[test]
    fn finds_documents_by_name() {
        let root = fixture("name");
        let source = DocumentSource::new(&root).pre_extension(Some("m"));
        let document = source.find("/person/").unwrap();
        assert_eq!(document.path, root.join("person.m.js"));
        assert_eq!(document.extension, "js");
        assert_eq!(document.name, "person");
        let document = source.find("/").unwrap();
        assert_eq!(document.path, root.join("default.m.js"));
    }

    #[test]
    fn falls_back_to_other_extensions() {
        let root = fixture("fallback");
        fs::remove_file(root.join("person.m.js")).unwrap();
        let source = DocumentSource::new(&root).pre_extension(Some("m"));
        let document = source.find("/person/").unwrap();
        assert_eq!(document.path, root.join("person/default.m.py"));
        assert_eq!(document.extension, "py");
    }

    #[test]
    fn ignores_other_tokens_and_traversal() {
        let root = fixture("tokens");
        let source = DocumentSource::new(&root).pre_extension(Some("m"));
        assert!(source.find("/about/").is_none());
        assert!(source.find("/../person/").is_none());
    }

    #[test]
    fn caches_lookups_for_validity_interval() {
        let root = fixture("cache");
        let source = DocumentSource::new(&root)
            .pre_extension(Some("m"))
            .validity(Duration::from_secs(60));
        assert!(source.find("/new/").is_none());
        fs::write(root.join("new.m.js"), "new").unwrap();
        assert!(source.find("/new/").is_none());
        let uncached = DocumentSource::new(&root).pre_extension(Some("m"));
        assert!(uncached.find("/new/").is_some());
    }

    #[test]
    fn sweeps_expired_lookups() {
        let root = fixture("sweep");
        let source = DocumentSource::new(&root)
            .pre_extension(Some("m"))
            .validity(Duration::from_millis(20));
        for index in 0..SWEEP_INTERVAL - 1 {
            assert!(source.find(&format!("/missing-{index}/")).is_none());
        }
        assert_eq!(source.cache.len(), SWEEP_INTERVAL - 1);
        std::thread::sleep(Duration::from_millis(40));
        assert!(source.find("/person/").is_some());
        assert_eq!(source.cache.len(), 1);
    }
}
