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

//! Node types.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::context::Context;
use crate::node::assets::{AssetNode, Pipeline};
use crate::node::auth::AuthNode;
use crate::node::cache_control::CacheControlNode;
use crate::node::capture::CaptureNode;
use crate::node::chain::ChainNode;
use crate::node::cors::CorsNode;
use crate::node::dispatch::DispatchNode;
use crate::node::files::StaticNode;
use crate::node::filter::FilterNode;
use crate::node::injector::InjectorNode;
use crate::node::manual::{ManualNode, TemplatesNode};
use crate::node::redirect::{AddSlashNode, RedirectMode, RedirectNode};
use crate::node::resource::ResourceNode;
use crate::node::router::RouterNode;
use crate::node::status::StatusNode;
use crate::node::{Node, Resolved};
use crate::{Error, Result};

use super::Shorthand;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Node type with configuration.
///
/// Every node type of the catalogue is a variant holding the configuration
/// of that type, which is read with a fixed set of allowed fields, so typos
/// in configuration are reported instead of silently ignored.
#[derive(Clone, Debug)]
pub enum Kind {
    /// Static files.
    Static(StaticNode),
    /// Manual resources.
    Manual(ManualNode),
    /// Template resources.
    Templates(TemplatesNode),
    /// Dispatch to a dispatcher.
    Dispatch(DispatchNode),
    /// Internal redirect.
    Capture(CaptureNode),
    /// Redirect.
    Redirect(RedirectNode),
    /// Redirect adding a trailing slash.
    AddSlash(AddSlashNode),
    /// Router.
    Router(RouterNode),
    /// Chain of fallbacks.
    Chain(ChainNode),
    /// Filter implemented by a library document.
    Filter(FilterNode),
    /// Injector of request attributes.
    Injector(InjectorNode),
    /// Client caching headers.
    CacheControl(CacheControlNode),
    /// Cross-origin resource sharing headers.
    Cors(CorsNode),
    /// Basic authentication.
    BasicHttpAuthenticator(AuthNode),
    /// Fixed status.
    Status(StatusNode),
    /// Registered resource.
    Resource(ResourceNode),
    /// Unification and minification of scripts.
    JavaScriptUnifyMinify(AssetNode),
    /// Unification and minification of style sheets.
    CssUnifyMinify(AssetNode),
    /// Style sheets compiled from LESS.
    Less(AssetNode),
    /// Style sheets compiled from ZUSS.
    Zuss(AssetNode),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Kind {
    /// Creates a node type from its name and configuration fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the name doesn't denote a node type,
    /// and [`Error::Json`] if the fields are not a valid configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use serde_json::Map;
    /// use trellis::descriptor::Kind;
    /// use trellis::node::Node;
    ///
    /// // Create node type without configuration
    /// let kind = Kind::from_parts("fallback", Map::new())?;
    /// assert_eq!(kind.name(), "chain");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_parts(name: &str, fields: Map<String, Value>) -> Result<Self> {
        let fields = Value::Object(fields);
        Ok(match name {
            "static" => Kind::Static(read(fields)?),
            "manual" => Kind::Manual(read(fields)?),
            "templates" => Kind::Templates(read(fields)?),
            "dispatch" => Kind::Dispatch(read(fields)?),
            "capture" => Kind::Capture(read(fields)?),
            "redirect" => Kind::Redirect(read(fields)?),
            "addSlash" => Kind::AddSlash(read(fields)?),
            "router" => Kind::Router(read(fields)?),
            "chain" | "fallback" => Kind::Chain(read(fields)?),
            "filter" => Kind::Filter(read(fields)?),
            "injector" => Kind::Injector(read(fields)?),
            "cacheControl" => Kind::CacheControl(read(fields)?),
            "cors" => Kind::Cors(read(fields)?),
            "basicHttpAuthenticator" => {
                Kind::BasicHttpAuthenticator(read(fields)?)
            }
            "status" => Kind::Status(read(fields)?),
            "resource" => Kind::Resource(read(fields)?),
            "javaScriptUnifyMinify" => Kind::JavaScriptUnifyMinify(read(fields)?),
            "cssUnifyMinify" => Kind::CssUnifyMinify(read(fields)?),
            "less" => Kind::Less(read(fields)?),
            "zuss" => Kind::Zuss(read(fields)?),
            _ => return Err(Error::UnknownType(name.to_string())),
        })
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for Kind {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        match self {
            Kind::Static(node) => node.create(ctx, uri),
            Kind::Manual(node) => node.create(ctx, uri),
            Kind::Templates(node) => node.create(ctx, uri),
            Kind::Dispatch(node) => node.create(ctx, uri),
            Kind::Capture(node) => node.create(ctx, uri),
            Kind::Redirect(node) => node.create(ctx, uri),
            Kind::AddSlash(node) => node.create(ctx, uri),
            Kind::Router(node) => node.create(ctx, uri),
            Kind::Chain(node) => node.create(ctx, uri),
            Kind::Filter(node) => node.create(ctx, uri),
            Kind::Injector(node) => node.create(ctx, uri),
            Kind::CacheControl(node) => node.create(ctx, uri),
            Kind::Cors(node) => node.create(ctx, uri),
            Kind::BasicHttpAuthenticator(node) => node.create(ctx, uri),
            Kind::Status(node) => node.create(ctx, uri),
            Kind::Resource(node) => node.create(ctx, uri),
            Kind::JavaScriptUnifyMinify(node) => {
                node.build(ctx, uri, Pipeline::Unify("js"))
            }
            Kind::CssUnifyMinify(node) => {
                node.build(ctx, uri, Pipeline::Unify("css"))
            }
            Kind::Less(node) => node.build(ctx, uri, Pipeline::Compile("less")),
            Kind::Zuss(node) => node.build(ctx, uri, Pipeline::Compile("zuss")),
        }
    }

    fn name(&self) -> &str {
        match self {
            Kind::Static(_) => "static",
            Kind::Manual(_) => "manual",
            Kind::Templates(_) => "templates",
            Kind::Dispatch(_) => "dispatch",
            Kind::Capture(_) => "capture",
            Kind::Redirect(_) => "redirect",
            Kind::AddSlash(_) => "addSlash",
            Kind::Router(_) => "router",
            Kind::Chain(_) => "chain",
            Kind::Filter(_) => "filter",
            Kind::Injector(_) => "injector",
            Kind::CacheControl(_) => "cacheControl",
            Kind::Cors(_) => "cors",
            Kind::BasicHttpAuthenticator(_) => "basicHttpAuthenticator",
            Kind::Status(_) => "status",
            Kind::Resource(_) => "resource",
            Kind::JavaScriptUnifyMinify(_) => "javaScriptUnifyMinify",
            Kind::CssUnifyMinify(_) => "cssUnifyMinify",
            Kind::Less(_) => "less",
            Kind::Zuss(_) => "zuss",
        }
    }
}

impl TryFrom<Shorthand> for Kind {
    type Error = Error;

    /// Attempts to lower a shorthand into a node type.
    ///
    /// # Errors
    ///
    /// Returns an error for [`Shorthand::Hidden`], which has no node type,
    /// and for shorthands naming unknown node types.
    fn try_from(shorthand: Shorthand) -> Result<Self> {
        Ok(match shorthand {
            Shorthand::Hidden => {
                return Err(Error::Malformed(String::from("hidden")));
            }
            Shorthand::Status(code) => Kind::Status(StatusNode { code }),
            Shorthand::Capture { uri, hide } => Kind::Capture(CaptureNode {
                uri,
                application: None,
                hidden: hide,
                locals: BTreeMap::new(),
            }),
            Shorthand::Redirect(uri) => Kind::Redirect(RedirectNode {
                uri,
                mode: RedirectMode::default(),
            }),
            Shorthand::Dispatch { dispatcher, id } => {
                Kind::Dispatch(DispatchNode {
                    id,
                    dispatcher,
                    locals: BTreeMap::new(),
                })
            }
            Shorthand::Resource(class) => Kind::Resource(ResourceNode { class }),
            Shorthand::Type(name) => return Kind::from_parts(&name, Map::new()),
        })
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Reads a node configuration from the given fields.
fn read<T>(fields: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(fields).map_err(Into::into)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn reads_every_node_type() {
        let next = json!({ "next": "!404" });
        for (name, config) in [
            ("static", json!({})),
            ("manual", json!({})),
            ("templates", json!({})),
            ("dispatch", json!({ "id": "person" })),
            ("capture", json!({ "uri": "/a/" })),
            ("redirect", json!({ "uri": "/a/", "mode": "seeOther" })),
            ("addSlash", json!({})),
            ("router", json!({ "routes": { "/": "!404" } })),
            ("chain", json!({ "nodes": ["!404"] })),
            ("fallback", json!({ "restlets": ["!404"] })),
            ("filter", json!({ "library": "filters/log", "next": "!404" })),
            ("injector", json!({ "locals": { "a": 1 }, "next": "!404" })),
            ("cacheControl", next.clone()),
            ("cors", next.clone()),
            ("basicHttpAuthenticator", next.clone()),
            ("status", json!({ "code": 204 })),
            ("resource", json!({ "class": "Person" })),
            ("javaScriptUnifyMinify", next.clone()),
            ("cssUnifyMinify", next.clone()),
            ("less", next.clone()),
            ("zuss", next.clone()),
        ] {
            let kind = Kind::from_parts(name, fields(config));
            assert!(kind.is_ok(), "{name}: {kind:?}");
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = Kind::from_parts("status", fields(json!({ "cod": 1 })));
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn rejects_missing_fields() {
        let result = Kind::from_parts("filter", Map::new());
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
