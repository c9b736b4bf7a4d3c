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

//! Route descriptors.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;
use std::{fmt, result};
use std::sync::Arc;

use super::node::Node;
use super::{Error, Result};

mod kind;
mod shorthand;

pub use kind::Kind;
pub use shorthand::Shorthand;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Route descriptor.
///
/// A descriptor is the configuration of a single routing position, which is
/// resolved into a handler, or hides the position. Descriptors are read from
/// JSON values in one of the following forms:
///
/// - strings, which are [`Shorthand`] descriptors
/// - arrays, which are chains of descriptors, tried in order
/// - objects, which name the node type in the `type` field, with all other
///   fields being the configuration of that node type
///
/// Shorthands are lowered into the same [`Kind`] values the object form
/// produces, so both forms are equivalent by construction. Additionally, a
/// pre-built [`Node`] can be passed in directly from code.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use trellis::descriptor::Descriptor;
///
/// // Create descriptors from shorthand and object forms
/// let short: Descriptor = serde_json::from_str(r#""!404""#)?;
/// let long: Descriptor = serde_json::from_str(r#"{"type": "status", "code": 404}"#)?;
/// assert_eq!(format!("{short:?}"), format!("{long:?}"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub enum Descriptor {
    /// Hidden route.
    Hidden,
    /// Chain of descriptors.
    Chain(Vec<Descriptor>),
    /// Node type with configuration.
    Kind(Box<Kind>),
    /// Pre-built node.
    Node(Arc<dyn Node>),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Descriptor {
    /// Creates a descriptor from a pre-built node.
    pub fn node<N>(node: N) -> Self
    where
        N: Node,
    {
        Descriptor::Node(Arc::new(node))
    }

    /// Returns the name of the descriptor, used when logging routes.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Hidden => "hidden",
            Descriptor::Chain(_) => "chain",
            Descriptor::Kind(kind) => kind.name(),
            Descriptor::Node(node) => node.name(),
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<Kind> for Descriptor {
    #[inline]
    fn from(kind: Kind) -> Self {
        Descriptor::Kind(Box::new(kind))
    }
}

impl FromStr for Descriptor {
    type Err = Error;

    /// Creates a descriptor from a shorthand.
    ///
    /// # Errors
    ///
    /// Returns an error if the shorthand is malformed, or names an unknown
    /// node type.
    fn from_str(value: &str) -> Result<Self> {
        match value.parse()? {
            Shorthand::Hidden => Ok(Descriptor::Hidden),
            shorthand => Kind::try_from(shorthand).map(Into::into),
        }
    }
}

impl TryFrom<Value> for Descriptor {
    type Error = Error;

    /// Attempts to create a descriptor from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a string, an array, nor an
    /// object with a `type` field, or if any nested descriptor is invalid.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(value) => value.parse(),
            Value::Array(values) => values
                .into_iter()
                .map(Descriptor::try_from)
                .collect::<Result<_>>()
                .map(Descriptor::Chain),
            Value::Object(mut fields) => match fields.remove("type") {
                Some(Value::String(name)) => {
                    Kind::from_parts(&name, fields).map(Into::into)
                }
                Some(value) => Err(Error::Malformed(value.to_string())),
                None => Err(Error::Malformed(String::from(
                    "object without type",
                ))),
            },
            value => Err(Error::Malformed(value.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Descriptor::try_from(value).map_err(D::Error::custom)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Descriptor::Hidden => f.write_str("Hidden"),
            Descriptor::Chain(nodes) => {
                f.debug_tuple("Chain").field(nodes).finish()
            }
            Descriptor::Kind(kind) => fmt::Debug::fmt(kind, f),
            Descriptor::Node(node) => write!(f, "Node({})", node.name()),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_arrays_as_chains() -> Result {
        let descriptor = Descriptor::try_from(json!(["manual", "static"]))?;
        let Descriptor::Chain(nodes) = descriptor else {
            panic!("expected chain");
        };
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].name(), "static");
        Ok(())
    }

    #[test]
    fn lowers_shorthands_to_kinds() -> Result {
        let short = Descriptor::try_from(json!("/target/!"))?;
        let long = Descriptor::try_from(json!({
            "type": "capture", "uri": "/target/", "hidden": true
        }))?;
        assert_eq!(format!("{short:?}"), format!("{long:?}"));
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        for value in [json!(1), json!(null), json!({}), json!({"type": 1})] {
            assert!(Descriptor::try_from(value).is_err());
        }
        assert!(matches!(
            Descriptor::try_from(json!("coffee")),
            Err(Error::UnknownType(_))
        ));
        assert!(matches!(
            Descriptor::try_from(json!({"type": "static", "rooot": "x"})),
            Err(Error::Json(_))
        ));
    }
}
