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

//! Matcher route.

use std::fmt;
use std::str::FromStr;

mod error;

pub use error::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Parameter holding the unmatched remainder of a prefix route.
pub const REMAINDER: &str = "rr";

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Matching mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Matching {
    /// The route must match the entire path.
    #[default]
    Equals,
    /// The route must match a prefix of the path.
    StartsWith,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Matcher route.
///
/// Routes are URI templates that have been confirmed to start with `/`, and
/// which might contain variables denoted by `{...}` brackets. A trailing `*`
/// turns a route into a prefix route, matching itself and everything below.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis_serve::handler::matcher::{Matching, Route};
///
/// // Create prefix route from string
/// let route: Route = "/person/{id}/*".parse()?;
/// assert_eq!(route.as_str(), "/person/{id}/");
/// assert_eq!(route.matching(), Matching::StartsWith);
/// assert_eq!(route.variables().count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Route path.
    path: String,
    /// Matching mode.
    matching: Matching,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Route {
    /// Creates a route from a path and matching mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a valid template.
    pub fn new<P>(path: P, matching: Matching) -> Result<Self>
    where
        P: AsRef<str>,
    {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(Error::Empty);
        }

        // Ensure route starts with `/`
        if !path.starts_with('/') {
            return Err(Error::Relative(path.to_string()));
        }

        // Ensure variables are well-formed
        validate(path)?;
        Ok(Self { path: path.to_string(), matching })
    }

    /// Returns the patterns that implement the route.
    ///
    /// Exact routes map to a single pattern, while prefix routes are expanded
    /// into the prefix itself, and a catch-all pattern capturing everything
    /// after it as the [`REMAINDER`] parameter. Prefixes ending in a variable
    /// only match on segment boundaries.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use trellis_serve::handler::matcher::Route;
    ///
    /// // Create prefix route from string
    /// let route: Route = "/static*".parse()?;
    /// assert_eq!(route.patterns(), ["/static", "/static{*rr}"]);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        let path = self.path.as_str();
        let catch_all = format!("{{*{REMAINDER}}}");
        match self.matching {
            Matching::Equals => vec![path.to_string()],
            Matching::StartsWith if path.ends_with('}') => vec![
                path.to_string(),
                format!("{path}/"),
                format!("{path}/{catch_all}"),
            ],
            Matching::StartsWith => {
                vec![path.to_string(), format!("{path}{catch_all}")]
            }
        }
    }

    /// Returns an iterator over the names of all variables.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.path.split('{').skip(1).filter_map(|part| {
            part.split_once('}').map(|(name, _)| name)
        })
    }

    /// Returns the number of literal characters outside of variables.
    #[must_use]
    pub fn literal_len(&self) -> usize {
        let mut depth = 0usize;
        let mut count = 0;
        for char in self.path.chars() {
            match char {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ if depth == 0 => count += 1,
                _ => {}
            }
        }
        count
    }
}

#[allow(clippy::must_use_candidate)]
impl Route {
    /// Returns the string representation, without a trailing `*`.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the matching mode.
    #[inline]
    pub fn matching(&self) -> Matching {
        self.matching
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for Route {
    type Err = Error;

    /// Attempts to create a route from a string.
    ///
    /// # Errors
    ///
    /// In case conversion fails, an [`Error`] is returned.
    fn from_str(value: &str) -> Result<Self> {
        match value.strip_suffix('*') {
            Some("") => Err(Error::Empty),
            Some(path) => Self::new(path, Matching::StartsWith),
            None => Self::new(value, Matching::Equals),
        }
    }
}

impl AsRef<str> for Route {
    fn as_ref(&self) -> &str {
        self.path.as_str()
    }
}

impl fmt::Display for Route {
    /// Formats the route for display, including the trailing `*` of prefix
    /// routes, so the result can be parsed again.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.path)?;
        if self.matching == Matching::StartsWith {
            f.write_str("*")?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Cleans a URI by collapsing repeated slashes and ensuring a leading slash.
///
/// # Examples
///
/// ```
/// use trellis_serve::handler::matcher::route::clean;
///
/// assert_eq!(clean("_manual//prudence/"), "/_manual/prudence/");
/// assert_eq!(clean(""), "/");
/// ```
#[must_use]
pub fn clean(uri: &str) -> String {
    let mut clean = String::with_capacity(uri.len() + 1);
    clean.push('/');
    for char in uri.chars() {
        if !(char == '/' && clean.ends_with('/')) {
            clean.push(char);
        }
    }
    clean
}

/// Ensures that all variables in the given path are closed and named.
fn validate(path: &str) -> Result {
    let mut open = None;
    for (index, char) in path.char_indices() {
        match (char, open) {
            ('{', None) => open = Some(index),
            ('}', Some(start)) if index > start + 1 => open = None,
            ('{' | '}', _) => return Err(Error::Template(path.to_string())),
            _ => {}
        }
    }
    match open {
        Some(_) => Err(Error::Template(path.to_string())),
        None => Ok(()),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_prefix_patterns() -> Result {
        let route = Route::from_str("/static/*")?;
        assert_eq!(route.patterns(), ["/static/", "/static/{*rr}"]);
        let route = Route::from_str("/*")?;
        assert_eq!(route.patterns(), ["/", "/{*rr}"]);
        let route = Route::from_str("/a/{id}*")?;
        assert_eq!(route.patterns(), ["/a/{id}", "/a/{id}/", "/a/{id}/{*rr}"]);
        Ok(())
    }

    #[test]
    fn counts_variables_and_literals() -> Result {
        let route = Route::from_str("/a/{id}/{name}/")?;
        assert_eq!(route.variables().collect::<Vec<_>>(), ["id", "name"]);
        assert_eq!(route.literal_len(), 5);
        Ok(())
    }

    #[test]
    fn rejects_malformed_templates() {
        assert!(matches!(Route::from_str(""), Err(Error::Empty)));
        assert!(matches!(Route::from_str("*"), Err(Error::Empty)));
        assert!(matches!(Route::from_str("a/"), Err(Error::Relative(_))));
        assert!(matches!(Route::from_str("/a/{id/"), Err(Error::Template(_))));
        assert!(matches!(Route::from_str("/a/{}/"), Err(Error::Template(_))));
    }

    #[test]
    fn cleans_uris() {
        assert_eq!(clean("/a//b///c/"), "/a/b/c/");
        assert_eq!(clean("a/"), "/a/");
    }
}
