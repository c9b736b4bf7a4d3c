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

//! Resource node.

use serde::Deserialize;

use crate::context::Context;
use crate::{Error, Result};

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Resource node, using a handler registered with the assembler by name.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceNode {
    /// Name of the resource.
    pub class: String,
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for ResourceNode {
    fn create(&self, ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        ctx.registry()
            .resource(&self.class)
            .map(Resolved::Handler)
            .ok_or_else(|| Error::UnknownResource(self.class.clone()))
    }

    fn name(&self) -> &str {
        "resource"
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use trellis_serve::handler::Handler;
    use trellis_serve::http::{Request, Response, ResponseExt, Status};

    use crate::executor::Registry;

    use super::*;

    #[test]
    fn uses_registered_resources() {
        let mut registry = Registry::default();
        registry.add_resource("Hello", |_: Request| Response::from_text("hi"));
        let mut ctx =
            Context::new("app", ".").with_registry(Arc::new(registry));
        let node = ResourceNode { class: String::from("Hello") };
        let handler = node.create(&mut ctx, "/").unwrap().into_handler();
        assert_eq!(handler.handle(Request::new()).status, Status::Ok);
    }

    #[test]
    fn rejects_unknown_resources() {
        let mut ctx = Context::new("app", ".");
        let node = ResourceNode { class: String::from("Missing") };
        let result = node.create(&mut ctx, "/");
        assert!(matches!(result, Err(Error::UnknownResource(_))));
    }
}
