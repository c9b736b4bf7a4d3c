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

//! URI templates.

use std::fmt;

use trellis_serve::http::{Header, Request};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Template part.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    /// Literal text.
    Literal(String),
    /// Variable name.
    Variable(String),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// URI template.
///
/// Templates are expanded against a request. Besides request attributes, in
/// particular the variables written by routers, the following variables are
/// available:
///
/// - `{ri}`: full reference of the request, including any mount point
/// - `{rp}`: path of the request, relative to the current mount point
/// - `{rq}`: query string of the request
/// - `{rr}`: remainder of the path matched by a prefix route
/// - `{rh}`: host the request was sent to
///
/// Unknown variables expand to nothing, and unclosed braces are kept as is.
///
/// # Examples
///
/// ```
/// use trellis::template::Template;
/// use trellis_serve::http::Request;
///
/// // Create template and expand against request
/// let template = Template::new("/items/{id}/?{rq}");
/// let req = Request::new().uri("/item/?view=full").attribute("id", "42");
/// assert_eq!(template.expand(&req), "/items/42/?view=full");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    /// Template parts.
    parts: Vec<Part>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Template {
    /// Creates a template from the given string.
    #[must_use]
    pub fn new(value: &str) -> Self {
        let mut parts = Vec::new();
        let mut rest = value;
        while let Some(start) = rest.find('{') {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            let name = &rest[start + 1..start + end];
            parts.push(Part::Variable(name.to_string()));
            rest = &rest[start + end + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }
        Self { parts }
    }

    /// Expands the template against the given request.
    #[must_use]
    pub fn expand(&self, req: &Request) -> String {
        let mut value = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => value.push_str(text),
                Part::Variable(name) => value.push_str(&variable(req, name)),
            }
        }
        value
    }

    /// Returns whether the template contains variables.
    #[must_use]
    pub fn has_variables(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Variable(_)))
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Literal(text) => f.write_str(text)?,
                Part::Variable(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns the value of the variable with the given name.
fn variable(req: &Request, name: &str) -> String {
    let value = match name {
        "ri" => return req.reference(),
        "rp" => Some(req.uri.path.as_str()),
        "rq" => req.uri.query.as_deref(),
        "rh" => req.headers.get(Header::Host),
        _ => req.attributes.get(name),
    };
    value.unwrap_or_default().to_string()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::handler::matcher::REMAINDER;
    use trellis_serve::http::request::BASE;

    use super::*;

    #[test]
    fn expands_request_variables() {
        let req = Request::new()
            .uri("/a/b/?x=1")
            .header(Header::Host, "example.com")
            .attribute(BASE, "/app")
            .attribute(REMAINDER, "b/");
        let template = Template::new("{rh}|{ri}|{rp}|{rq}|{rr}|{missing}");
        assert_eq!(
            template.expand(&req),
            "example.com|/app/a/b/|/a/b/|x=1|b/|"
        );
    }

    #[test]
    fn keeps_unclosed_braces() {
        let template = Template::new("/a/{id");
        assert!(!template.has_variables());
        assert_eq!(template.to_string(), "/a/{id");
    }
}
