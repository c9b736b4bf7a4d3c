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

//! Shorthand descriptors.

use std::str::FromStr;

use crate::{Error, Result};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Shorthand descriptor.
///
/// Strings in route tables are shorthands for common descriptors, which are
/// distinguished by their first character:
///
/// - `hidden` or `!`: hides the route
/// - `!404`: status node answering with the given status code
/// - `/uri/`: capture of the given URI, hiding it if followed by `!`
/// - `>uri`: redirect to the given URI
/// - `@id` or `@dispatcher:id`: dispatch of the given identifier
/// - `$name`: resource registered under the given name
/// - anything else: node type without configuration, e.g. `static`
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::descriptor::Shorthand;
///
/// // Parse dispatch shorthand
/// let shorthand: Shorthand = "@python:person".parse()?;
/// assert_eq!(shorthand, Shorthand::Dispatch {
///     dispatcher: Some(String::from("python")),
///     id: String::from("person"),
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shorthand {
    /// Hidden route.
    Hidden,
    /// Status node.
    Status(u16),
    /// Capture node.
    Capture {
        /// Target URI.
        uri: String,
        /// Whether to hide the target URI.
        hide: bool,
    },
    /// Redirect node.
    Redirect(String),
    /// Dispatch node.
    Dispatch {
        /// Dispatcher name.
        dispatcher: Option<String>,
        /// Dispatch identifier.
        id: String,
    },
    /// Resource node.
    Resource(String),
    /// Node type without configuration.
    Type(String),
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for Shorthand {
    type Err = Error;

    /// Parses a shorthand descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the string is empty, or a prefix is
    /// followed by an invalid or empty remainder.
    fn from_str(value: &str) -> Result<Self> {
        let malformed = || Error::Malformed(value.to_string());
        let Some(first) = value.chars().next() else {
            return Err(malformed());
        };

        // Dispatch on the first character
        let rest = &value[first.len_utf8()..];
        match first {
            '!' if rest.is_empty() => Ok(Shorthand::Hidden),
            '!' => rest
                .parse()
                .map(Shorthand::Status)
                .map_err(|_| malformed()),
            '/' => Ok(match value.strip_suffix('!') {
                Some(uri) => Shorthand::Capture { uri: uri.to_string(), hide: true },
                None => Shorthand::Capture { uri: value.to_string(), hide: false },
            }),
            '>' if rest.is_empty() => Err(malformed()),
            '>' => Ok(Shorthand::Redirect(rest.to_string())),
            '@' => match rest.split_once(':') {
                Some(("", _) | (_, "")) => Err(malformed()),
                Some((dispatcher, id)) => Ok(Shorthand::Dispatch {
                    dispatcher: Some(dispatcher.to_string()),
                    id: id.to_string(),
                }),
                None if rest.is_empty() => Err(malformed()),
                None => Ok(Shorthand::Dispatch {
                    dispatcher: None,
                    id: rest.to_string(),
                }),
            },
            '$' if rest.is_empty() => Err(malformed()),
            '$' => Ok(Shorthand::Resource(rest.to_string())),
            _ if value == "hidden" => Ok(Shorthand::Hidden),
            _ => Ok(Shorthand::Type(value.to_string())),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixes() -> Result {
        assert_eq!("hidden".parse::<Shorthand>()?, Shorthand::Hidden);
        assert_eq!("!".parse::<Shorthand>()?, Shorthand::Hidden);
        assert_eq!("!404".parse::<Shorthand>()?, Shorthand::Status(404));
        assert_eq!(
            "/about/info/!".parse::<Shorthand>()?,
            Shorthand::Capture { uri: String::from("/about/info/"), hide: true }
        );
        assert_eq!(
            ">https://example.com/".parse::<Shorthand>()?,
            Shorthand::Redirect(String::from("https://example.com/"))
        );
        assert_eq!(
            "@person".parse::<Shorthand>()?,
            Shorthand::Dispatch { dispatcher: None, id: String::from("person") }
        );
        assert_eq!(
            "$Person".parse::<Shorthand>()?,
            Shorthand::Resource(String::from("Person"))
        );
        assert_eq!(
            "static".parse::<Shorthand>()?,
            Shorthand::Type(String::from("static"))
        );
        Ok(())
    }

    #[test]
    fn rejects_malformed_shorthands() {
        for value in ["", "!abc", "!99999", "@", "@:id", "@lang:", "$", ">"] {
            assert!(
                matches!(value.parse::<Shorthand>(), Err(Error::Malformed(_))),
                "{value}"
            );
        }
    }
}
